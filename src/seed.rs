//! Deterministic trait seed derivation
//!
//! A seed picks one variant index per layer for a token identifier. The
//! derivation keccak-256 hashes externally supplied entropy together with
//! the identifier, then slices the 256-bit digest into five 48-bit fields
//! (least-significant bits first: background, body, accessory, head,
//! glasses) and reduces each modulo the layer's live variant count.
//!
//! The computation is pure given (entropy, identifier, counts), so a seed
//! is reproducible from the same inputs. Unpredictability in advance is an
//! assumption on the [`EntropySource`]: the entropy value must not exist,
//! or be controllable, before the request commits (a recent block hash is
//! the canonical choice). Nothing here enforces that.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use thiserror::Error;

/// Fixed-width external entropy value (block-hash shaped).
pub type Entropy = [u8; 32];

/// Width in bits of each per-layer digest field.
const FIELD_BITS: usize = 48;
const FIELD_BYTES: usize = FIELD_BITS / 8;

/// The five independently-variable layers of a composed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Background,
    Body,
    Accessory,
    Head,
    Glasses,
}

/// Layers in digest-field order, least-significant field first.
pub const LAYERS: [Layer; 5] = [
    Layer::Background,
    Layer::Body,
    Layer::Accessory,
    Layer::Head,
    Layer::Glasses,
];

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Background => "background",
            Layer::Body => "body",
            Layer::Accessory => "accessory",
            Layer::Head => "head",
            Layer::Glasses => "glasses",
        };
        f.write_str(name)
    }
}

/// Error type for seed derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// A layer had zero variants; no default index is substituted.
    #[error("no variants available for layer '{0}'")]
    NoVariantsAvailable(Layer),
    /// The entropy source could not produce a value.
    #[error("entropy unavailable: {0}")]
    EntropyUnavailable(String),
    /// The trait count source could not produce a snapshot.
    #[error("trait counts unavailable: {0}")]
    CountsUnavailable(String),
}

/// Snapshot of live per-layer variant counts, fetched at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitCounts {
    pub background: u64,
    pub body: u64,
    pub accessory: u64,
    pub head: u64,
    pub glasses: u64,
}

impl TraitCounts {
    pub const fn new(background: u64, body: u64, accessory: u64, head: u64, glasses: u64) -> Self {
        Self {
            background,
            body,
            accessory,
            head,
            glasses,
        }
    }

    fn get(&self, layer: Layer) -> u64 {
        match layer {
            Layer::Background => self.background,
            Layer::Body => self.body,
            Layer::Accessory => self.accessory,
            Layer::Head => self.head,
            Layer::Glasses => self.glasses,
        }
    }
}

/// One selected variant index per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub background: u64,
    pub body: u64,
    pub accessory: u64,
    pub head: u64,
    pub glasses: u64,
}

/// Supplies a recent, hard-to-predict-in-advance entropy value.
pub trait EntropySource {
    fn recent_entropy(&self) -> Result<Entropy, SeedError>;
}

/// Supplies the current per-layer variant counts.
pub trait TraitCountSource {
    fn trait_counts(&self) -> Result<TraitCounts, SeedError>;
}

/// Entropy pinned to a known value, for replay and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub Entropy);

impl EntropySource for FixedEntropy {
    fn recent_entropy(&self) -> Result<Entropy, SeedError> {
        Ok(self.0)
    }
}

/// Counts pinned to a known snapshot, for replay and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedCounts(pub TraitCounts);

impl TraitCountSource for FixedCounts {
    fn trait_counts(&self) -> Result<TraitCounts, SeedError> {
        Ok(self.0)
    }
}

/// Generates seeds from injected entropy and trait count sources.
///
/// Stateless per call; generator instances carry no mutable state and
/// calls for different identifiers are fully independent.
#[derive(Debug)]
pub struct SeedGenerator<E, C> {
    entropy: E,
    counts: C,
}

impl<E: EntropySource, C: TraitCountSource> SeedGenerator<E, C> {
    pub fn new(entropy: E, counts: C) -> Self {
        Self { entropy, counts }
    }

    /// Produce the seed for `token_id` against live counts and entropy.
    pub fn generate(&self, token_id: u64) -> Result<Seed, SeedError> {
        let entropy = self.entropy.recent_entropy()?;
        let counts = self.counts.trait_counts()?;
        derive_seed(&entropy, token_id, &counts)
    }
}

/// Pure seed derivation from explicit inputs.
///
/// Split out from [`SeedGenerator`] so the bit-slicing and modulo step is
/// testable independent of any real entropy source.
pub fn derive_seed(
    entropy: &Entropy,
    token_id: u64,
    counts: &TraitCounts,
) -> Result<Seed, SeedError> {
    for layer in LAYERS {
        if counts.get(layer) == 0 {
            return Err(SeedError::NoVariantsAvailable(layer));
        }
    }

    let digest = pseudorandomness(entropy, token_id);
    let pick = |i: usize, layer: Layer| field_at(&digest, i) % counts.get(layer);

    Ok(Seed {
        background: pick(0, Layer::Background),
        body: pick(1, Layer::Body),
        accessory: pick(2, Layer::Accessory),
        head: pick(3, Layer::Head),
        glasses: pick(4, Layer::Glasses),
    })
}

/// keccak-256 over `entropy ‖ token_id` with the identifier widened to a
/// 32-byte big-endian word, matching the packed-word convention of
/// ledger-side implementations of this derivation.
fn pseudorandomness(entropy: &Entropy, token_id: u64) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(entropy);
    let mut id_word = [0u8; 32];
    id_word[24..].copy_from_slice(&token_id.to_be_bytes());
    hasher.update(id_word);
    hasher.finalize().into()
}

/// Extract the `i`-th 48-bit field of the digest, interpreting the digest
/// as a big-endian 256-bit integer and counting fields from the
/// least-significant bit. Field 0 is therefore the last six digest bytes.
fn field_at(digest: &[u8; 32], i: usize) -> u64 {
    let end = digest.len() - i * FIELD_BYTES;
    let start = end - FIELD_BYTES;
    digest[start..end]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTROPY: Entropy = [0xab; 32];

    fn counts() -> TraitCounts {
        TraitCounts::new(3, 30, 140, 240, 21)
    }

    #[test]
    fn test_field_extraction_positions() {
        let mut digest = [0u8; 32];
        // field 0 occupies the last six bytes
        digest[26..32].copy_from_slice(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        // field 4 occupies bytes 2..8; bytes 0..2 are the unused top bits
        digest[2..8].copy_from_slice(&[0xff, 0, 0, 0, 0, 0x01]);
        assert_eq!(field_at(&digest, 0), 0x010203040506);
        assert_eq!(field_at(&digest, 1), 0);
        assert_eq!(field_at(&digest, 4), 0xff0000000001);
    }

    #[test]
    fn test_seed_fields_within_counts() {
        let counts = counts();
        for token_id in 0..200u64 {
            let seed = derive_seed(&ENTROPY, token_id, &counts).unwrap();
            assert!(seed.background < counts.background);
            assert!(seed.body < counts.body);
            assert!(seed.accessory < counts.accessory);
            assert!(seed.head < counts.head);
            assert!(seed.glasses < counts.glasses);
        }
    }

    #[test]
    fn test_reproducible_for_same_inputs() {
        let generator = SeedGenerator::new(FixedEntropy(ENTROPY), FixedCounts(counts()));
        let first = generator.generate(42).unwrap();
        let second = generator.generate(42).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_variant_layers_always_pick_zero() {
        let counts = TraitCounts::new(1, 1, 1, 1, 1);
        let seed = derive_seed(&ENTROPY, 7, &counts).unwrap();
        assert_eq!(
            seed,
            Seed {
                background: 0,
                body: 0,
                accessory: 0,
                head: 0,
                glasses: 0
            }
        );
    }

    #[test]
    fn test_zero_count_rejected() {
        let counts = TraitCounts::new(3, 0, 140, 240, 21);
        assert_eq!(
            derive_seed(&ENTROPY, 1, &counts),
            Err(SeedError::NoVariantsAvailable(Layer::Body))
        );
    }

    #[test]
    fn test_different_entropy_changes_selection() {
        // With counts this large, identical seeds from different entropy
        // would need five simultaneous 40-bit collisions.
        let wide = TraitCounts::new(1 << 40, 1 << 40, 1 << 40, 1 << 40, 1 << 40);
        let a = derive_seed(&[0x11; 32], 1, &wide).unwrap();
        let b = derive_seed(&[0x22; 32], 1, &wide).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_identifiers_change_selection() {
        let wide = TraitCounts::new(1 << 40, 1 << 40, 1 << 40, 1 << 40, 1 << 40);
        let a = derive_seed(&ENTROPY, 1, &wide).unwrap();
        let b = derive_seed(&ENTROPY, 2, &wide).unwrap();
        assert_ne!(a, b);
    }
}
