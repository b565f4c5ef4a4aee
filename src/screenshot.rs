use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::{SketchError, SCREENSHOT_PREFIX};

/// Where screenshots go when no directory was given on the command line.
pub fn default_screenshot_dir() -> PathBuf {
    if let Some(user_dirs) = directories::UserDirs::new() {
        if let Some(documents) = user_dirs.document_dir() {
            return documents.to_path_buf();
        }
        return user_dirs.home_dir().to_path_buf();
    }
    PathBuf::from(".")
}

/// First `<dir>/ShaderSketch_Screenshot_<n>.png` that does not exist yet, `n >= 1`.
pub fn next_screenshot_path(dir: &Path) -> PathBuf {
    let mut n = 1u32;
    loop {
        let path = dir.join(format!("{}{}.png", SCREENSHOT_PREFIX, n));
        if !path.exists() {
            return path;
        }
        n += 1;
    }
}

/// Drops the per-row padding wgpu requires for buffer copies.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut unpadded = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * padded_bytes_per_row as usize;
        unpadded.extend_from_slice(&data[start..start + row_bytes]);
    }
    unpadded
}

/// Swaps the red and blue channels of tightly packed 4-byte pixels in place.
pub fn bgra_to_rgba(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
}

pub fn save_png(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<(), SketchError> {
    let file = File::create(path).map_err(|e| SketchError::io(path, e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    Ok(())
}
