// Shader prelude injection, macro expansion and @import handling
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::{SketchError, MAX_TEXTURE_UNITS};

/// Source language of a shader file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderLanguage {
    Wgsl,
    Glsl,
    Hlsl,
}

impl ShaderLanguage {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "wgsl" => Some(ShaderLanguage::Wgsl),
            "glsl" => Some(ShaderLanguage::Glsl),
            "hlsl" => Some(ShaderLanguage::Hlsl),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ShaderLanguage::Wgsl => "wgsl",
            ShaderLanguage::Glsl => "glsl",
            ShaderLanguage::Hlsl => "hlsl",
        }
    }
}

/// Output of [`Preprocessor::preprocess`]: prelude + expanded source, and every
/// file pulled in through `@import`.
#[derive(Debug, Clone)]
pub struct PreprocessedShader {
    pub source: String,
    pub dependencies: Vec<PathBuf>,
}

pub struct Preprocessor {
    name: String,
    language: ShaderLanguage,
    imported_files: HashSet<PathBuf>,
    dependencies: Vec<PathBuf>,
}

impl Preprocessor {
    pub fn new(name: impl Into<String>, language: ShaderLanguage) -> Self {
        Self {
            name: name.into(),
            language,
            imported_files: HashSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// Expands imports and macros and prepends the prelude.
    ///
    /// `source_path` is the file `source` was read from; imports resolve
    /// relative to its directory. Built-in sources pass `None` and cannot import.
    pub fn preprocess(mut self, source: &str, source_path: Option<&Path>) -> Result<PreprocessedShader, SketchError> {
        if let Some(path) = source_path {
            self.imported_files.insert(normalize(path));
        }
        let base_dir = source_path.map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf());

        let mut body = self.expand_imports(source, base_dir.as_deref())?;
        if self.language == ShaderLanguage::Glsl {
            body = Regex::new(r"(?m)^[ \t]*#version[^\n]*\n?")
                .map_err(regex_error)?
                .replace_all(&body, "")
                .to_string();
        }
        let body = self.replace_macros(&body)?;

        let source = prelude(self.language) + &body;
        if std::env::var("DEBUG_SHADER").is_ok() {
            log::debug!("[shader] processed {}:\n{}", self.name, source);
        }

        Ok(PreprocessedShader {
            source,
            dependencies: self.dependencies,
        })
    }

    fn expand_imports(&mut self, source: &str, base_dir: Option<&Path>) -> Result<String, SketchError> {
        let mut source = source.to_string();
        let import_re = Regex::new(r#"@import\("([^"]+)"\)"#).map_err(regex_error)?;

        loop {
            let captures: Vec<(String, String)> = import_re
                .captures_iter(&source)
                .map(|cap| (cap[0].to_string(), cap[1].to_string()))
                .collect();

            if captures.is_empty() {
                break;
            }

            for (full_match, filename) in captures {
                let Some(dir) = base_dir else {
                    return Err(SketchError::ShaderCompile {
                        name: self.name.clone(),
                        message: format!("@import(\"{}\") needs a shader loaded from disk", filename),
                    });
                };

                let path = normalize(&dir.join(&filename));
                if !self.imported_files.insert(path.clone()) {
                    source = source.replacen(&full_match, &format!("// Already imported: {}", filename), 1);
                    continue;
                }

                self.dependencies.push(path.clone());
                let imported = fs::read_to_string(&path).map_err(|e| SketchError::io(&path, e))?;
                let import_dir = path.parent().map(Path::to_path_buf);
                let processed = self.expand_imports(&imported, import_dir.as_deref())?;

                source = source.replacen(&full_match, &format!("// Imported from {}\n{}\n", filename, processed), 1);
            }
        }

        Ok(source)
    }

    fn replace_macros(&self, source: &str) -> Result<String, SketchError> {
        let mut source = source
            .replace("@engine.time", "_sketch.time")
            .replace("@engine.delta_time", "_sketch.delta_time")
            .replace("@engine.frame", "_sketch.frame")
            .replace("@engine.inputs", "_sketch.input_count")
            .replace("@engine.resolution", "_sketch.resolution")
            .replace("@engine.mouse", "_sketch.mouse")
            .replace("@engine.sampler", "_sketch_sampler");

        let input_re = Regex::new(r"@input\((\d+)\)").map_err(regex_error)?;
        for cap in input_re.captures_iter(&source) {
            let index: usize = cap[1].parse().unwrap_or(usize::MAX);
            if index >= MAX_TEXTURE_UNITS {
                return Err(SketchError::InputOutOfRange { index, max: MAX_TEXTURE_UNITS });
            }
        }

        let language = self.language;
        source = input_re
            .replace_all(&source, |cap: &regex::Captures| match language {
                ShaderLanguage::Glsl => format!("sampler2D(_input_{}, _sketch_sampler)", &cap[1]),
                _ => format!("_input_{}", &cap[1]),
            })
            .to_string();

        Ok(source)
    }
}

/// Declarations prepended to every user shader.
pub fn prelude(language: ShaderLanguage) -> String {
    let mut header = String::new();
    match language {
        ShaderLanguage::Glsl => {
            header.push_str("#version 450\n");
            header.push_str("// shadersketch prelude\n\n");
            header.push_str("layout(set = 0, binding = 0) uniform sampler _sketch_sampler;\n");
            for i in 0..MAX_TEXTURE_UNITS {
                header.push_str(&format!("layout(set = 0, binding = {}) uniform texture2D _input_{};\n", i + 1, i));
            }
            header.push_str("\nlayout(set = 1, binding = 0) uniform SketchGlobals {\n");
            header.push_str("    float time;\n");
            header.push_str("    float delta_time;\n");
            header.push_str("    uint frame;\n");
            header.push_str("    uint input_count;\n");
            header.push_str("    vec2 resolution;\n");
            header.push_str("    vec2 _padding;\n");
            header.push_str("    vec4 mouse; // xy = cursor, zw = left press position or -1\n");
            header.push_str("} _sketch;\n\n");
            header.push_str("layout(location = 0) in vec2 v_uv;\n");
            header.push_str("layout(location = 0) out vec4 frag_color;\n\n");
        }
        ShaderLanguage::Wgsl | ShaderLanguage::Hlsl => {
            header.push_str("// shadersketch prelude\n\n");
            header.push_str("struct SketchGlobals {\n");
            header.push_str("    time: f32,\n");
            header.push_str("    delta_time: f32,\n");
            header.push_str("    frame: u32,\n");
            header.push_str("    input_count: u32,\n");
            header.push_str("    resolution: vec2f,\n");
            header.push_str("    _padding: vec2f,\n");
            header.push_str("    mouse: vec4f, // xy = cursor, zw = left press position or -1\n");
            header.push_str("}\n\n");
            header.push_str("struct SketchVertexOutput {\n");
            header.push_str("    @builtin(position) position: vec4f,\n");
            header.push_str("    @location(0) uv: vec2f,\n");
            header.push_str("}\n\n");
            header.push_str("@group(0) @binding(0) var _sketch_sampler: sampler;\n");
            for i in 0..MAX_TEXTURE_UNITS {
                header.push_str(&format!("@group(0) @binding({}) var _input_{}: texture_2d<f32>;\n", i + 1, i));
            }
            header.push_str("\n@group(1) @binding(0) var<uniform> _sketch: SketchGlobals;\n\n");
        }
    }
    header
}

/// Parses and validates a preprocessed shader with naga, turning failures into
/// readable diagnostics before wgpu sees the source.
pub fn validate(name: &str, source: &str, language: ShaderLanguage) -> Result<naga::Module, SketchError> {
    let compile_error = |message: String| SketchError::ShaderCompile { name: name.to_string(), message };

    let module = match language {
        ShaderLanguage::Wgsl => naga::front::wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?,
        ShaderLanguage::Glsl => {
            let options = naga::front::glsl::Options::from(naga::ShaderStage::Fragment);
            naga::front::glsl::Frontend::default()
                .parse(&options, source)
                .map_err(|e| compile_error(e.emit_to_string(source)))?
        }
        ShaderLanguage::Hlsl => return Err(SketchError::UnsupportedLanguage(language.extension().to_string())),
    };

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::default())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    Ok(module)
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn regex_error(e: regex::Error) -> SketchError {
    SketchError::ShaderCompile {
        name: "<prelude>".to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGSL_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: SketchVertexOutput) -> @location(0) vec4f {
    let c = textureSample(@input(1), @engine.sampler, in.uv);
    let m = @engine.mouse.xy / @engine.resolution;
    return c * sin(@engine.time) + vec4f(m, f32(@engine.inputs), 1.0);
}
"#;

    const GLSL_FRAGMENT: &str = r#"#version 330
void main() {
    vec4 c = texture(@input(0), v_uv);
    frag_color = c * @engine.time + vec4(@engine.mouse.xy / @engine.resolution, 0.0, 1.0);
}
"#;

    #[test]
    fn language_comes_from_extension() {
        assert_eq!(ShaderLanguage::from_path(Path::new("a/b.WGSL")), Some(ShaderLanguage::Wgsl));
        assert_eq!(ShaderLanguage::from_path(Path::new("b.glsl")), Some(ShaderLanguage::Glsl));
        assert_eq!(ShaderLanguage::from_path(Path::new("b.Hlsl")), Some(ShaderLanguage::Hlsl));
        assert_eq!(ShaderLanguage::from_path(Path::new("b.png")), None);
        assert_eq!(ShaderLanguage::from_path(Path::new("noext")), None);
    }

    #[test]
    fn expands_engine_macros() {
        let out = Preprocessor::new("test", ShaderLanguage::Wgsl)
            .preprocess(WGSL_FRAGMENT, None)
            .unwrap();
        assert!(out.source.contains("textureSample(_input_1, _sketch_sampler, in.uv)"));
        assert!(out.source.contains("sin(_sketch.time)"));
        assert!(out.source.contains("_sketch.mouse.xy / _sketch.resolution"));
        assert!(!out.source.contains("@engine"));
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn wgsl_output_validates() {
        let out = Preprocessor::new("test", ShaderLanguage::Wgsl)
            .preprocess(WGSL_FRAGMENT, None)
            .unwrap();
        let module = validate("test", &out.source, ShaderLanguage::Wgsl).unwrap();
        assert!(module.entry_points.iter().any(|e| e.name == "fs_main"));
    }

    #[test]
    fn glsl_version_is_replaced_and_output_validates() {
        let out = Preprocessor::new("test", ShaderLanguage::Glsl)
            .preprocess(GLSL_FRAGMENT, None)
            .unwrap();
        assert!(out.source.starts_with("#version 450\n"));
        assert!(!out.source.contains("#version 330"));
        assert!(out.source.contains("texture(sampler2D(_input_0, _sketch_sampler), v_uv)"));
        validate("test", &out.source, ShaderLanguage::Glsl).unwrap();
    }

    #[test]
    fn input_index_past_the_last_unit_is_rejected() {
        let src = format!("// uses @input({})", MAX_TEXTURE_UNITS);
        let err = Preprocessor::new("test", ShaderLanguage::Wgsl)
            .preprocess(&src, None)
            .unwrap_err();
        assert!(matches!(err, SketchError::InputOutOfRange { index, .. } if index == MAX_TEXTURE_UNITS));
    }

    #[test]
    fn imports_resolve_relative_to_the_importer_and_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/noise.wgsl"), "@import(\"common.wgsl\")\nfn noise() -> f32 { return HALF; }\n").unwrap();
        fs::write(dir.path().join("lib/common.wgsl"), "const HALF: f32 = 0.5;\n").unwrap();
        let main = dir.path().join("main.wgsl");
        let src = "@import(\"lib/noise.wgsl\")\n@import(\"lib/common.wgsl\")\n";
        fs::write(&main, src).unwrap();

        let out = Preprocessor::new("main", ShaderLanguage::Wgsl)
            .preprocess(src, Some(&main))
            .unwrap();

        assert_eq!(out.source.matches("const HALF").count(), 1);
        assert!(out.source.contains("// Already imported: lib/common.wgsl"));
        assert!(out.source.contains("fn noise()"));
        assert_eq!(out.dependencies.len(), 2);
        assert!(out.dependencies[0].ends_with("lib/noise.wgsl"));
        assert!(out.dependencies[1].ends_with("lib/common.wgsl"));
    }

    #[test]
    fn self_import_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("loop.wgsl");
        let src = "@import(\"loop.wgsl\")\nconst X: f32 = 1.0;\n";
        fs::write(&main, src).unwrap();

        let out = Preprocessor::new("loop", ShaderLanguage::Wgsl)
            .preprocess(src, Some(&main))
            .unwrap();
        assert_eq!(out.source.matches("const X").count(), 1);
        assert!(out.dependencies.is_empty());
    }

    #[test]
    fn missing_import_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.wgsl");
        let err = Preprocessor::new("main", ShaderLanguage::Wgsl)
            .preprocess("@import(\"nope.wgsl\")", Some(&main))
            .unwrap_err();
        assert!(matches!(err, SketchError::Io { .. }));
    }

    #[test]
    fn builtin_sources_cannot_import() {
        let err = Preprocessor::new("builtin", ShaderLanguage::Wgsl)
            .preprocess("@import(\"x.wgsl\")", None)
            .unwrap_err();
        assert!(matches!(err, SketchError::ShaderCompile { .. }));
    }

    #[test]
    fn broken_wgsl_reports_a_diagnostic() {
        let out = Preprocessor::new("broken", ShaderLanguage::Wgsl)
            .preprocess("fn fs_main( {", None)
            .unwrap();
        let err = validate("broken", &out.source, ShaderLanguage::Wgsl).unwrap_err();
        match err {
            SketchError::ShaderCompile { name, message } => {
                assert_eq!(name, "broken");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hlsl_has_no_front_end() {
        let err = validate("x", "float4 main() : SV_Target { return 0; }", ShaderLanguage::Hlsl).unwrap_err();
        assert!(matches!(err, SketchError::UnsupportedLanguage(ext) if ext == "hlsl"));
    }
}
