//! PNG output for decoded grids
//!
//! Writing a decoded layer back to PNG closes the verification loop:
//! encode, persist, read back, decode, compare against the source image.

use image::RgbaImage;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::codec::PixelGrid;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Convert a pixel grid to an RGBA image buffer.
pub fn to_image(grid: &PixelGrid) -> RgbaImage {
    let mut img = RgbaImage::new(grid.width(), grid.height());
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(color) = grid.get(x, y) {
                img.put_pixel(x, y, color.into());
            }
        }
    }
    img
}

/// Save a pixel grid to a PNG file, creating parent directories as needed.
pub fn save_png(grid: &PixelGrid, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    to_image(grid).save(path)?;
    Ok(())
}
