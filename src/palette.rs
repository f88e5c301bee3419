//! Shared palette registry for a collection of encoded images
//!
//! The registry assigns one-byte indices to colors in first-seen order.
//! Index 0 is reserved for fully transparent pixels so every image in a
//! collection agrees on how "nothing here" is encoded.

use std::collections::HashMap;
use thiserror::Error;

use crate::color::{Color, TRANSPARENT};

/// Hard limit imposed by the one-byte palette index field.
pub const MAX_PALETTE_SIZE: usize = 256;

/// Error when registering colors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    /// A 257th distinct color was requested; the index field is one byte.
    #[error("palette overflow: cannot register more than {MAX_PALETTE_SIZE} distinct colors")]
    PaletteOverflow,
}

/// Ordered, deduplicated set of colors shared across a batch of images.
///
/// Indices are assigned in first-seen order and never change once assigned,
/// so a fixed sequence of registrations always produces the same palette.
#[derive(Debug, Clone)]
pub struct PaletteRegistry {
    colors: Vec<Color>,
    lookup: HashMap<Color, u8>,
}

impl PaletteRegistry {
    /// Create a registry holding only the reserved transparent entry.
    pub fn new() -> Self {
        let mut registry = Self {
            colors: Vec::new(),
            lookup: HashMap::new(),
        };
        registry.colors.push(TRANSPARENT);
        registry.lookup.insert(TRANSPARENT, 0);
        registry
    }

    /// Return the index for `color`, registering it if unseen.
    ///
    /// Fully transparent colors all map to the reserved index 0 regardless
    /// of their RGB channels; an invisible pixel has no meaningful color.
    pub fn index_of(&mut self, color: Color) -> Result<u8, PaletteError> {
        let color = if color.is_transparent() {
            TRANSPARENT
        } else {
            color
        };
        if let Some(&index) = self.lookup.get(&color) {
            return Ok(index);
        }
        if self.colors.len() >= MAX_PALETTE_SIZE {
            return Err(PaletteError::PaletteOverflow);
        }
        let index = self.colors.len() as u8;
        self.colors.push(color);
        self.lookup.insert(color, index);
        Ok(index)
    }

    /// Look up a color by index (read-only, used by decode).
    pub fn get(&self, index: u8) -> Option<Color> {
        self.colors.get(index as usize).copied()
    }

    /// The palette in index order.
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Number of registered colors, including the reserved transparent entry.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        // Never true: index 0 is always present.
        self.colors.is_empty()
    }

    /// Rebuild a registry from a persisted palette, preserving order.
    ///
    /// Used when decoding an artifact: indices in the encoded bodies refer
    /// to positions in the persisted color list.
    pub fn from_colors(colors: &[Color]) -> Result<Self, PaletteError> {
        if colors.len() > MAX_PALETTE_SIZE {
            return Err(PaletteError::PaletteOverflow);
        }
        let mut lookup = HashMap::new();
        for (i, &color) in colors.iter().enumerate() {
            lookup.entry(color).or_insert(i as u8);
        }
        Ok(Self {
            colors: colors.to_vec(),
            lookup,
        })
    }
}

impl Default for PaletteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
