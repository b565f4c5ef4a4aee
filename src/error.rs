use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the sketch library. The application logs and absorbs them.
#[derive(Error, Debug)]
pub enum SketchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to write PNG: {0}")]
    Png(#[from] png::EncodingError),
    #[error("Shader {name} failed to compile:\n{message}")]
    ShaderCompile { name: String, message: String },
    #[error("No shader front-end for .{0} sources")]
    UnsupportedLanguage(String),
    #[error("@input({index}) is out of range, only {max} texture units exist")]
    InputOutOfRange { index: usize, max: usize },
    #[error("All {0} texture units are in use")]
    TooManyInputs(usize),
    #[error("Texture is {width}x{height}, the GPU takes 1 to {max} texels per side")]
    TextureSize { width: u32, height: u32, max: u32 },
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
    #[error("GPU error: {0}")]
    Gpu(String),
}

impl SketchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SketchError::Io { path: path.into(), source }
    }
}
