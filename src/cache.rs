//! Resource cache for shader sources and decoded images.
//!
//! Every lookup name passes through the registered [`ResourceRouter`]s first,
//! so the virtual `Shader.wgsl` can stand for whatever file the user dropped.
//! Shaders remember the files they imported; [`ResourceCache::reload_with_dependencies`]
//! evicts a shader when any of them changes, and the next lookup recompiles it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::RgbaImage;

use crate::preprocess::{Preprocessor, ShaderLanguage};
use crate::router::ResourceRouter;
use crate::SketchError;

const DEFAULT_SHADER: &str = include_str!("shaders/default.wgsl");

/// A preprocessed shader ready to hand to the renderer.
#[derive(Debug)]
pub struct ShaderResource {
    /// Name the shader was requested under (before routing).
    pub name: String,
    /// File the source came from, `None` for built-in shaders.
    pub path: Option<PathBuf>,
    pub language: ShaderLanguage,
    /// Prelude + expanded source.
    pub source: String,
    /// Files pulled in through `@import`.
    pub dependencies: Vec<PathBuf>,
}

impl ShaderResource {
    /// Whether a change to `path` makes this shader stale.
    pub fn depends_on(&self, path: &Path) -> bool {
        self.path.as_deref() == Some(path) || self.dependencies.iter().any(|d| d == path)
    }
}

/// What [`ResourceCache::reload_with_dependencies`] touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reloaded {
    /// A cached shader was evicted; the name is the one it was requested under.
    Shader(String),
    /// A cached image was decoded again.
    Image(PathBuf),
}

#[derive(Default)]
pub struct ResourceCache {
    routers: Vec<Rc<dyn ResourceRouter>>,
    builtins: HashMap<&'static str, &'static str>,
    shaders: HashMap<String, Rc<ShaderResource>>,
    images: HashMap<PathBuf, Rc<RgbaImage>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        let mut builtins = HashMap::new();
        builtins.insert("Shader.wgsl", DEFAULT_SHADER);
        Self {
            builtins,
            ..Default::default()
        }
    }

    pub fn add_router(&mut self, router: Rc<dyn ResourceRouter>) {
        self.routers.push(router);
    }

    /// Applies every router, in registration order, to `name`.
    pub fn resolve(&self, name: &str) -> String {
        self.routers
            .iter()
            .fold(name.to_string(), |name, router| router.route(&name).unwrap_or(name))
    }

    /// Returns the cached shader for `name`, loading and preprocessing it on a miss.
    pub fn shader(&mut self, name: &str) -> Result<Rc<ShaderResource>, SketchError> {
        let resolved = self.resolve(name);
        if let Some(shader) = self.shaders.get(&resolved) {
            return Ok(shader.clone());
        }

        let shader = Rc::new(self.load_shader(name, &resolved)?);
        log::info!("[shader] loaded {} as {}", name, resolved);
        self.shaders.insert(resolved, shader.clone());
        Ok(shader)
    }

    fn load_shader(&self, name: &str, resolved: &str) -> Result<ShaderResource, SketchError> {
        if let Some(source) = self.builtins.get(resolved) {
            let processed = Preprocessor::new(name, ShaderLanguage::Wgsl).preprocess(source, None)?;
            return Ok(ShaderResource {
                name: name.to_string(),
                path: None,
                language: ShaderLanguage::Wgsl,
                source: processed.source,
                dependencies: processed.dependencies,
            });
        }

        let path = PathBuf::from(resolved);
        let language = ShaderLanguage::from_path(&path).ok_or_else(|| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            SketchError::UnsupportedLanguage(ext.to_string())
        })?;
        let source = fs::read_to_string(&path).map_err(|e| SketchError::io(&path, e))?;
        let processed = Preprocessor::new(name, language).preprocess(&source, Some(&path))?;

        Ok(ShaderResource {
            name: name.to_string(),
            path: Some(path),
            language,
            source: processed.source,
            dependencies: processed.dependencies,
        })
    }

    /// Returns the decoded image at `path`, decoding it on a miss.
    pub fn image(&mut self, path: &Path) -> Result<Rc<RgbaImage>, SketchError> {
        if let Some(image) = self.images.get(path) {
            return Ok(image.clone());
        }
        let image = Rc::new(decode_image(path)?);
        self.images.insert(path.to_path_buf(), image.clone());
        Ok(image)
    }

    pub fn release_image(&mut self, path: &Path) {
        self.images.remove(path);
    }

    /// Reacts to a change of `path` on disk.
    ///
    /// Shaders that read `path` (directly or through an import) are evicted so
    /// the next lookup rebuilds them. A cached image at `path` is decoded again
    /// right away; if that fails the old pixels stay.
    pub fn reload_with_dependencies(&mut self, path: &Path) -> Vec<Reloaded> {
        let mut reloaded = Vec::new();

        let stale: Vec<String> = self
            .shaders
            .iter()
            .filter(|(_, shader)| shader.depends_on(path))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            if let Some(shader) = self.shaders.remove(&key) {
                log::info!("[hot-reload] {} changed, reloading {}", path.display(), shader.name);
                reloaded.push(Reloaded::Shader(shader.name.clone()));
            }
        }

        if self.images.contains_key(path) {
            match decode_image(path) {
                Ok(image) => {
                    self.images.insert(path.to_path_buf(), Rc::new(image));
                    log::info!("[hot-reload] reloaded image {}", path.display());
                    reloaded.push(Reloaded::Image(path.to_path_buf()));
                }
                Err(e) => log::warn!("[hot-reload] keeping previous {}: {}", path.display(), e),
            }
        }

        reloaded
    }

    /// Drops every cached shader loaded from `path`, so the next lookup reads
    /// the file again. Returns the names that were evicted.
    pub fn evict_shader(&mut self, path: &Path) -> Vec<String> {
        let stale: Vec<String> = self
            .shaders
            .iter()
            .filter(|(_, shader)| shader.path.as_deref() == Some(path))
            .map(|(key, _)| key.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|key| self.shaders.remove(&key))
            .map(|shader| shader.name.clone())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    #[cfg(test)]
    pub(crate) fn image_count(&self) -> usize {
        self.images.len()
    }
}

fn decode_image(path: &Path) -> Result<RgbaImage, SketchError> {
    let image = image::open(path).map_err(|source| SketchError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}
