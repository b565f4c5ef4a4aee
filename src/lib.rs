// Shared library for the shadersketch live shader previewer
pub mod cache;
pub mod error;
pub mod preprocess;
pub mod renderer;
pub mod router;
pub mod screenshot;
pub mod sketch;
pub mod watcher;

pub use cache::{Reloaded, ResourceCache, ShaderResource};
pub use error::SketchError;
pub use preprocess::{PreprocessedShader, Preprocessor, ShaderLanguage};
pub use renderer::{Globals, InputTexture, Material, Renderer};
pub use router::{ResourceRouter, ShaderRouter};
pub use sketch::{classify_drop, DropAction, InputEntry, Sketch, ThumbnailRect};
pub use watcher::ReloadDispatcher;

/// Number of texture units a material exposes as `@input(0)` .. `@input(N-1)`.
pub const MAX_TEXTURE_UNITS: usize = 8;

pub const WINDOW_TITLE: &str = "ShaderSketch";
pub const WINDOW_WIDTH: u32 = 600;
pub const WINDOW_HEIGHT: u32 = 600;

/// Edge length of an input thumbnail in pixels.
pub const THUMBNAIL_SIZE: u32 = 64;
/// Horizontal distance between neighbouring thumbnails (size + 1px gap).
pub const THUMBNAIL_STRIDE: u32 = 65;

pub const SCREENSHOT_PREFIX: &str = "ShaderSketch_Screenshot_";

/// Extension of the virtual shader name materials ask the cache for.
pub const SHADER_EXTENSION: &str = "wgsl";
