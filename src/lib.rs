//! Traitforge - Library for encoding pixel-art trait layers and deriving trait seeds
//!
//! This library provides functionality to:
//! - Run-length encode fixed-size layer images against a shared palette
//! - Persist encoded collections as a stable JSON artifact
//! - Derive deterministic per-layer trait indices from external entropy

pub mod cli;
pub mod codec;
pub mod collection;
pub mod color;
pub mod import;
pub mod output;
pub mod palette;
pub mod seed;
