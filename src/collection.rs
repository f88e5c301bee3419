//! Collections of encoded images and the persisted artifact format
//!
//! A collection accumulates named encoded images against one shared
//! palette. Once finished it is handed off to [`CollectionWriter`], which
//! performs the single terminal write of the artifact:
//!
//! ```json
//! {
//!   "palette": ["#00000000", "#d5d7e1ff"],
//!   "images": [
//!     {"name": "head-cone", "data": "0x0a0c0302..."}
//!   ]
//! }
//! ```
//!
//! Palette order and image insertion order are preserved so downstream
//! byte-exact comparison against pre-computed references stays stable.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

use crate::codec::{self, CodecError, DecodedImage, EncodedImage, PixelGrid};
use crate::color::Color;
use crate::palette::PaletteRegistry;

/// Error type for collection building and artifact I/O.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Names are unique keys within a collection.
    #[error("duplicate image name '{0}' in collection")]
    DuplicateName(String),
    /// An artifact entry referenced a name that is not present.
    #[error("no image named '{0}' in artifact")]
    UnknownName(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Palette(#[from] crate::palette::PaletteError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One `{name, data}` entry in the persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub name: String,
    pub data: String,
}

/// The persisted artifact document: shared palette plus encoded images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub palette: Vec<Color>,
    pub images: Vec<ImageEntry>,
}

impl Artifact {
    /// Decode the named entry against the artifact's palette.
    pub fn decode(&self, name: &str) -> Result<DecodedImage, CollectionError> {
        let entry = self
            .images
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| CollectionError::UnknownName(name.to_string()))?;
        let image = EncodedImage::from_hex(&entry.name, &entry.data)?;
        let palette = PaletteRegistry::from_colors(&self.palette)?;
        Ok(codec::decode(&image, &palette)?)
    }

    /// Decode every entry in order, for round-trip verification.
    pub fn decode_all(&self) -> Result<Vec<(String, DecodedImage)>, CollectionError> {
        let palette = PaletteRegistry::from_colors(&self.palette)?;
        let mut out = Vec::with_capacity(self.images.len());
        for entry in &self.images {
            let image = EncodedImage::from_hex(&entry.name, &entry.data)?;
            out.push((entry.name.clone(), codec::decode(&image, &palette)?));
        }
        Ok(out)
    }
}

/// In-progress batch of encoded images sharing one palette.
///
/// Owned exclusively by the encoding session that created it; encode calls
/// are applied in caller order so palette index assignment is reproducible.
#[derive(Debug, Default)]
pub struct Collection {
    registry: PaletteRegistry,
    images: Vec<EncodedImage>,
    names: HashSet<String>,
}

impl Collection {
    pub fn new() -> Self {
        Self {
            registry: PaletteRegistry::new(),
            images: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Encode a full-frame grid and add it under `name`.
    ///
    /// Returns the hex form of the stored image.
    pub fn encode_image(&mut self, name: &str, grid: &PixelGrid) -> Result<String, CollectionError> {
        self.check_name(name)?;
        let encoded = codec::encode(name, grid, &mut self.registry)?;
        let hex = encoded.to_hex();
        self.insert(encoded);
        Ok(hex)
    }

    /// Encode only the non-transparent content of `grid`, recording its
    /// offset in the header. A fully blank grid falls back to a full-frame
    /// encode since there is nothing to trim around.
    pub fn encode_image_trimmed(
        &mut self,
        name: &str,
        grid: &PixelGrid,
    ) -> Result<String, CollectionError> {
        self.check_name(name)?;
        let encoded = match grid.content_bounds() {
            Some(bounds) => {
                let cropped = grid.crop(bounds)?;
                codec::encode_with_offset(
                    name,
                    &cropped,
                    &mut self.registry,
                    bounds.left as u8,
                    bounds.top as u8,
                )?
            }
            None => codec::encode(name, grid, &mut self.registry)?,
        };
        let hex = encoded.to_hex();
        self.insert(encoded);
        Ok(hex)
    }

    /// Add an already-encoded image under its own name.
    pub fn add(&mut self, image: EncodedImage) -> Result<(), CollectionError> {
        self.check_name(image.name())?;
        self.insert(image);
        Ok(())
    }

    pub fn registry(&self) -> &PaletteRegistry {
        &self.registry
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Snapshot the collection as an artifact document.
    pub fn to_artifact(&self) -> Artifact {
        Artifact {
            palette: self.registry.colors().to_vec(),
            images: self
                .images
                .iter()
                .map(|image| ImageEntry {
                    name: image.name().to_string(),
                    data: image.to_hex(),
                })
                .collect(),
        }
    }

    fn check_name(&self, name: &str) -> Result<(), CollectionError> {
        if self.names.contains(name) {
            return Err(CollectionError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn insert(&mut self, image: EncodedImage) {
        self.names.insert(image.name().to_string());
        self.images.push(image);
    }
}

/// Terminal writer for a finished collection.
///
/// Takes ownership of the collection; after [`CollectionWriter::write`]
/// the artifact on disk is the only remaining view of it.
#[derive(Debug)]
pub struct CollectionWriter {
    collection: Collection,
}

impl CollectionWriter {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    /// Serialize the full artifact and write it atomically.
    ///
    /// The document is rendered to a string first, written to a temporary
    /// file beside the destination, then renamed into place, so a failed
    /// write never leaves a partial artifact behind.
    pub fn write(self, destination: &Path) -> Result<(), CollectionError> {
        let artifact = self.collection.to_artifact();
        let json = serde_json::to_string_pretty(&artifact)?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = destination.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, destination)?;
        Ok(())
    }
}

/// Read a persisted artifact back from disk.
pub fn read_artifact(path: &Path) -> Result<Artifact, CollectionError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
