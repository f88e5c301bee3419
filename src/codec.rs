//! Run-length codec for fixed-size pixel-art layer images
//!
//! The wire format (version 1) is a 4-byte header followed by the body:
//!
//! ```text
//! header: width(u8) height(u8) left(u8) top(u8)
//! body:   repeated (palette_index: u8, run_length: u8)
//! ```
//!
//! Runs cover every pixel exactly once in row-major order, left-to-right,
//! top-to-bottom. Run lengths sum to width*height. A run longer than 255
//! pixels is split into consecutive pairs of the same index; otherwise
//! adjacent pairs never share an index (runs are maximal). The byte
//! sequence is exposed as lowercase hex with a `0x` marker so it embeds
//! safely in text artifacts.
//!
//! `left`/`top` carry the offset of a content-cropped layer inside its
//! original frame; full-frame encodes store 0.

use thiserror::Error;

use crate::color::{Color, TRANSPARENT};
use crate::palette::{PaletteError, PaletteRegistry};

/// Header length in bytes for format version 1.
pub const HEADER_LEN: usize = 4;

/// Largest value representable in the one-byte header dimension fields.
pub const MAX_DIMENSION: u32 = 255;

/// Longest run storable in the one-byte run-length field.
const MAX_RUN: u32 = 255;

/// Error type for encode/decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Grid dimensions exceed the header's one-byte fields.
    #[error("grid {width}x{height} exceeds the {MAX_DIMENSION}x{MAX_DIMENSION} format limit")]
    GridTooLarge { width: u32, height: u32 },
    /// Grid has zero width or height.
    #[error("grid has no pixels")]
    EmptyGrid,
    /// Body ended before width*height pixels were produced.
    #[error("truncated data: body ended after {produced} of {expected} pixels")]
    TruncatedData { produced: u32, expected: u32 },
    /// Body continues past width*height pixels.
    #[error("trailing data: body exceeds the {expected} pixels declared in the header")]
    TrailingData { expected: u32 },
    /// A run pair referenced an index outside the palette.
    #[error("palette index {index} out of range for palette of {palette_len} colors")]
    PaletteIndexOutOfRange { index: u8, palette_len: usize },
    /// A run pair declared zero pixels; the encoder never emits these.
    #[error("zero-length run in body")]
    ZeroRunLength,
    /// Hex string contained a non-hex character or an odd digit count.
    #[error("invalid hex in encoded image data")]
    InvalidHex,
    /// Palette could not absorb a color from the grid.
    #[error(transparent)]
    Palette(#[from] PaletteError),
}

/// A width x height rectangular grid of colors, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

/// Tight bounding rectangle around non-transparent content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelGrid {
    /// Create a fully transparent grid.
    pub fn new(width: u32, height: u32) -> Result<Self, CodecError> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![TRANSPARENT; (width * height) as usize],
        })
    }

    /// Create a grid from row-major pixels. The pixel count must match.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Color>) -> Result<Self, CodecError> {
        check_dimensions(width, height)?;
        let expected = (width * height) as usize;
        if pixels.len() != expected {
            return Err(CodecError::TruncatedData {
                produced: pixels.len().min(u32::MAX as usize) as u32,
                expected: expected as u32,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Row-major pixel slice.
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Tight bounds around non-transparent pixels, or `None` for a blank grid.
    pub fn content_bounds(&self) -> Option<Bounds> {
        let mut min_x = self.width;
        let mut min_y = self.height;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.pixels[(y * self.width + x) as usize].is_transparent() {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        if !any {
            return None;
        }
        Some(Bounds {
            left: min_x,
            top: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Copy out the sub-grid covered by `bounds`.
    pub fn crop(&self, bounds: Bounds) -> Result<PixelGrid, CodecError> {
        if bounds.left + bounds.width > self.width || bounds.top + bounds.height > self.height {
            return Err(CodecError::GridTooLarge {
                width: bounds.left + bounds.width,
                height: bounds.top + bounds.height,
            });
        }
        let mut pixels = Vec::with_capacity((bounds.width * bounds.height) as usize);
        for y in bounds.top..bounds.top + bounds.height {
            let row = (y * self.width + bounds.left) as usize;
            pixels.extend_from_slice(&self.pixels[row..row + bounds.width as usize]);
        }
        PixelGrid::from_pixels(bounds.width, bounds.height, pixels)
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), CodecError> {
    if width == 0 || height == 0 {
        return Err(CodecError::EmptyGrid);
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(CodecError::GridTooLarge { width, height });
    }
    Ok(())
}

/// A named, run-length-encoded image: header bytes plus run pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    name: String,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw header+body bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex with `0x` marker, for embedding in text artifacts.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(2 + self.bytes.len() * 2);
        out.push_str("0x");
        for byte in &self.bytes {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    /// Parse a hex string (with or without the `0x` marker) back into an
    /// encoded image. Only hex validity is checked here; structural checks
    /// happen in [`decode`].
    pub fn from_hex(name: &str, hex: &str) -> Result<Self, CodecError> {
        let digits = hex.strip_prefix("0x").unwrap_or(hex);
        if digits.len() % 2 != 0 {
            return Err(CodecError::InvalidHex);
        }
        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for i in (0..digits.len()).step_by(2) {
            let pair = &digits[i..i + 2];
            let byte = u8::from_str_radix(pair, 16).map_err(|_| CodecError::InvalidHex)?;
            bytes.push(byte);
        }
        Ok(Self {
            name: name.to_string(),
            bytes,
        })
    }
}

/// A decoded image plus the frame offset recorded in its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub grid: PixelGrid,
    pub left: u8,
    pub top: u8,
}

/// Run-length encode a grid against a shared palette registry.
///
/// Pure given the grid and the registry's accumulated state: the same
/// inputs always produce byte-identical output, which downstream
/// verification against persisted artifacts depends on.
pub fn encode(
    name: &str,
    grid: &PixelGrid,
    registry: &mut PaletteRegistry,
) -> Result<EncodedImage, CodecError> {
    encode_with_offset(name, grid, registry, 0, 0)
}

/// Like [`encode`], recording where a cropped layer sits in its frame.
pub fn encode_with_offset(
    name: &str,
    grid: &PixelGrid,
    registry: &mut PaletteRegistry,
    left: u8,
    top: u8,
) -> Result<EncodedImage, CodecError> {
    let mut bytes = vec![grid.width() as u8, grid.height() as u8, left, top];

    let mut run: Option<(u8, u32)> = None;
    for &pixel in grid.pixels() {
        let index = registry.index_of(pixel)?;
        match run {
            Some((run_index, len)) if run_index == index => run = Some((run_index, len + 1)),
            Some((run_index, len)) => {
                push_run(&mut bytes, run_index, len);
                run = Some((index, 1));
            }
            None => run = Some((index, 1)),
        }
    }
    if let Some((index, len)) = run {
        push_run(&mut bytes, index, len);
    }

    Ok(EncodedImage {
        name: name.to_string(),
        bytes,
    })
}

/// Flush one maximal run, splitting at the one-byte length cap.
fn push_run(bytes: &mut Vec<u8>, index: u8, mut len: u32) {
    while len > MAX_RUN {
        bytes.push(index);
        bytes.push(MAX_RUN as u8);
        len -= MAX_RUN;
    }
    bytes.push(index);
    bytes.push(len as u8);
}

/// Expand an encoded image back into a grid using the given palette.
///
/// Exposed for round-trip verification of persisted artifacts. Malformed
/// bodies are rejected, never silently tolerated.
pub fn decode(image: &EncodedImage, palette: &PaletteRegistry) -> Result<DecodedImage, CodecError> {
    let bytes = image.bytes();
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::TruncatedData {
            produced: 0,
            expected: 0,
        });
    }
    let width = bytes[0] as u32;
    let height = bytes[1] as u32;
    let left = bytes[2];
    let top = bytes[3];
    check_dimensions(width, height)?;
    let expected = width * height;

    let body = &bytes[HEADER_LEN..];
    if body.len() % 2 != 0 {
        return Err(CodecError::TruncatedData {
            produced: 0,
            expected,
        });
    }

    let mut pixels = Vec::with_capacity(expected as usize);
    for pair in body.chunks_exact(2) {
        let (index, len) = (pair[0], pair[1] as u32);
        if len == 0 {
            return Err(CodecError::ZeroRunLength);
        }
        let color = palette
            .get(index)
            .ok_or(CodecError::PaletteIndexOutOfRange {
                index,
                palette_len: palette.len(),
            })?;
        if pixels.len() as u32 + len > expected {
            return Err(CodecError::TrailingData { expected });
        }
        pixels.extend(std::iter::repeat(color).take(len as usize));
    }
    if (pixels.len() as u32) < expected {
        return Err(CodecError::TruncatedData {
            produced: pixels.len() as u32,
            expected,
        });
    }

    Ok(DecodedImage {
        grid: PixelGrid::from_pixels(width, height, pixels)?,
        left,
        top,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn grid_of(width: u32, height: u32, f: impl Fn(u32, u32) -> Color) -> PixelGrid {
        let mut grid = PixelGrid::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                grid.set(x, y, f(x, y));
            }
        }
        grid
    }

    #[test]
    fn test_transparent_grid_encodes_to_index_zero_runs() {
        let grid = PixelGrid::new(32, 32).unwrap();
        let mut registry = PaletteRegistry::new();
        let encoded = encode("empty", &grid, &mut registry).unwrap();

        let bytes = encoded.bytes();
        assert_eq!(&bytes[..HEADER_LEN], &[32, 32, 0, 0]);

        // 1024 transparent pixels split as 255+255+255+255+4, all at index 0
        let body = &bytes[HEADER_LEN..];
        assert_eq!(body, &[0, 255, 0, 255, 0, 255, 0, 255, 0, 4]);
        let total: u32 = body.chunks_exact(2).map(|p| p[1] as u32).sum();
        assert_eq!(total, 1024);
    }

    #[test]
    fn test_run_sum_equals_area_and_runs_maximal() {
        let red = Color::opaque(255, 0, 0);
        // 40 red pixels then transparency on a 32x32 frame
        let grid = grid_of(32, 32, |x, y| {
            if y * 32 + x < 40 {
                red
            } else {
                TRANSPARENT
            }
        });
        let mut registry = PaletteRegistry::new();
        let encoded = encode("badge", &grid, &mut registry).unwrap();

        let body = &encoded.bytes()[HEADER_LEN..];
        let pairs: Vec<(u8, u32)> = body.chunks_exact(2).map(|p| (p[0], p[1] as u32)).collect();
        assert_eq!(pairs[0], (1, 40));
        let total: u32 = pairs.iter().map(|&(_, len)| len).sum();
        assert_eq!(total, 1024);
        // adjacent runs only share an index when a 255-cap split forced it
        for window in pairs.windows(2) {
            assert!(window[0].0 != window[1].0 || window[0].1 == 255);
        }
    }

    #[test]
    fn test_run_longer_than_255_splits() {
        let blue = Color::opaque(0, 0, 255);
        let grid = grid_of(100, 10, |_, _| blue); // one 1000-pixel run
        let mut registry = PaletteRegistry::new();
        let encoded = encode("solid", &grid, &mut registry).unwrap();

        let body = &encoded.bytes()[HEADER_LEN..];
        assert_eq!(body, &[1, 255, 1, 255, 1, 255, 1, 235]);
    }

    #[test]
    fn test_run_of_exactly_255_and_256() {
        let c = Color::opaque(5, 5, 5);

        let grid = grid_of(255, 1, |_, _| c);
        let mut registry = PaletteRegistry::new();
        let encoded = encode("r255", &grid, &mut registry).unwrap();
        assert_eq!(&encoded.bytes()[HEADER_LEN..], &[1, 255]);

        let grid = grid_of(128, 2, |_, _| c); // area 256
        let mut registry = PaletteRegistry::new();
        let encoded = encode("r256", &grid, &mut registry).unwrap();
        assert_eq!(&encoded.bytes()[HEADER_LEN..], &[1, 255, 1, 1]);
    }

    #[test]
    fn test_roundtrip() {
        let grid = grid_of(16, 16, |x, y| {
            if (x + y) % 3 == 0 {
                TRANSPARENT
            } else if x < 8 {
                Color::opaque(200, 10, 10)
            } else {
                Color::opaque(10, 10, 200)
            }
        });
        let mut registry = PaletteRegistry::new();
        let encoded = encode("checker", &grid, &mut registry).unwrap();
        let decoded = decode(&encoded, &registry).unwrap();
        assert_eq!(decoded.grid, grid);
        assert_eq!((decoded.left, decoded.top), (0, 0));
    }

    #[test]
    fn test_encode_is_deterministic() {
        let grid = grid_of(8, 8, |x, _| {
            if x % 2 == 0 {
                Color::opaque(1, 2, 3)
            } else {
                TRANSPARENT
            }
        });
        let mut a = PaletteRegistry::new();
        let mut b = PaletteRegistry::new();
        let first = encode("twin", &grid, &mut a).unwrap();
        let second = encode("twin", &grid, &mut b).unwrap();
        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(first.to_hex(), second.to_hex());
    }

    #[test]
    fn test_hex_marker_and_case() {
        let grid = PixelGrid::new(2, 2).unwrap();
        let mut registry = PaletteRegistry::new();
        let encoded = encode("tiny", &grid, &mut registry).unwrap();
        let hex = encoded.to_hex();
        assert_eq!(hex, "0x020200000004");
        let parsed = EncodedImage::from_hex("tiny", &hex).unwrap();
        assert_eq!(parsed, encoded);
        // marker is optional on input
        let parsed = EncodedImage::from_hex("tiny", "020200000004").unwrap();
        assert_eq!(parsed.bytes(), encoded.bytes());
    }

    #[test]
    fn test_decode_truncated() {
        let registry = PaletteRegistry::new();
        // header says 4x4 but body covers only 10 pixels
        let image = EncodedImage::from_hex("bad", "0x0404000000030007").unwrap();
        match decode(&image, &registry) {
            Err(CodecError::TruncatedData { produced, expected }) => {
                assert_eq!(produced, 10);
                assert_eq!(expected, 16);
            }
            other => panic!("expected TruncatedData, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_trailing() {
        let registry = PaletteRegistry::new();
        // header says 2x2 but runs cover 5 pixels
        let image = EncodedImage::from_hex("bad", "0x020200000005").unwrap();
        assert_eq!(
            decode(&image, &registry),
            Err(CodecError::TrailingData { expected: 4 })
        );
    }

    #[test]
    fn test_decode_index_out_of_range() {
        let registry = PaletteRegistry::new(); // only transparent registered
        let image = EncodedImage::from_hex("bad", "0x020200000704").unwrap();
        assert_eq!(
            decode(&image, &registry),
            Err(CodecError::PaletteIndexOutOfRange {
                index: 7,
                palette_len: 1
            })
        );
    }

    #[test]
    fn test_decode_zero_length_run() {
        let registry = PaletteRegistry::new();
        let image = EncodedImage::from_hex("bad", "0x02020000000000000004").unwrap();
        assert_eq!(decode(&image, &registry), Err(CodecError::ZeroRunLength));
    }

    #[test]
    fn test_grid_too_large() {
        assert!(matches!(
            PixelGrid::new(256, 10),
            Err(CodecError::GridTooLarge { .. })
        ));
        assert!(matches!(PixelGrid::new(0, 10), Err(CodecError::EmptyGrid)));
    }

    #[test]
    fn test_content_bounds_and_crop() {
        let dot = Color::opaque(9, 9, 9);
        let mut grid = PixelGrid::new(10, 10).unwrap();
        grid.set(3, 4, dot);
        grid.set(6, 7, dot);

        let bounds = grid.content_bounds().unwrap();
        assert_eq!(
            bounds,
            Bounds {
                left: 3,
                top: 4,
                width: 4,
                height: 4
            }
        );

        let cropped = grid.crop(bounds).unwrap();
        assert_eq!(cropped.get(0, 0), Some(dot));
        assert_eq!(cropped.get(3, 3), Some(dot));
        assert_eq!(cropped.get(1, 1), Some(TRANSPARENT));

        assert!(PixelGrid::new(5, 5).unwrap().content_bounds().is_none());
    }

    #[test]
    fn test_offset_survives_roundtrip() {
        let grid = grid_of(4, 3, |_, _| Color::opaque(1, 1, 1));
        let mut registry = PaletteRegistry::new();
        let encoded = encode_with_offset("part", &grid, &mut registry, 12, 7).unwrap();
        let decoded = decode(&encoded, &registry).unwrap();
        assert_eq!((decoded.left, decoded.top), (12, 7));
        assert_eq!(decoded.grid, grid);
    }
}
