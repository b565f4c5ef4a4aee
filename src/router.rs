use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Rewrites resource names before the cache looks them up.
pub trait ResourceRouter {
    /// Returns the replacement name, or `None` to leave the request unchanged.
    fn route(&self, name: &str) -> Option<String>;
}

/// Name the material asks the cache for, e.g. `Shader.wgsl`.
pub fn virtual_shader_name(extension: &str) -> String {
    format!("Shader.{}", extension)
}

/// Maps the virtual shader name onto the file the user picked.
///
/// Shared between the sketch (writer) and the resource cache (reader) on the
/// main thread, hence the `RefCell`.
#[derive(Debug)]
pub struct ShaderRouter {
    virtual_name: String,
    shader_path: RefCell<Option<PathBuf>>,
}

impl ShaderRouter {
    pub fn new(extension: &str) -> Self {
        Self {
            virtual_name: virtual_shader_name(extension),
            shader_path: RefCell::new(None),
        }
    }

    pub fn virtual_name(&self) -> &str {
        &self.virtual_name
    }

    pub fn shader_path(&self) -> Option<PathBuf> {
        self.shader_path.borrow().clone()
    }

    /// Returns `false` when `path` is already the active shader.
    pub fn set_shader_path(&self, path: &Path) -> bool {
        let mut current = self.shader_path.borrow_mut();
        if current.as_deref() == Some(path) {
            return false;
        }
        *current = Some(path.to_path_buf());
        true
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.shader_path.borrow_mut().take();
    }
}

impl ResourceRouter for ShaderRouter {
    fn route(&self, name: &str) -> Option<String> {
        if name != self.virtual_name {
            return None;
        }
        self.shader_path
            .borrow()
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    }
}
