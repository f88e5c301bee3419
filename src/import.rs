//! PNG import: loading layer images into pixel grids

use image::GenericImageView;
use std::path::Path;
use thiserror::Error;

use crate::codec::{CodecError, PixelGrid};
use crate::color::Color;

/// Error type for PNG import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read '{path}': {source}")]
    Image {
        path: String,
        source: image::ImageError,
    },
    /// The image does not fit the encoded format's dimension fields.
    #[error("'{path}': {source}")]
    Codec {
        path: String,
        source: CodecError,
    },
}

/// Load a PNG file into a pixel grid.
///
/// All input is normalized to 8-bit RGBA; the codec treats alpha 0 as
/// transparent regardless of the RGB channels.
pub fn load_png(path: &Path) -> Result<PixelGrid, ImportError> {
    let display = path.display().to_string();
    let img = image::open(path).map_err(|source| ImportError::Image {
        path: display.clone(),
        source,
    })?;
    let (width, height) = img.dimensions();
    let rgba = img.to_rgba8();
    let pixels = rgba.pixels().map(|&p| Color::from(p)).collect();
    PixelGrid::from_pixels(width, height, pixels).map_err(|source| ImportError::Codec {
        path: display,
        source,
    })
}

/// Derive an image name from a file path (the stem, as the original
/// trait asset pipelines name parts after their source files).
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string()
}
