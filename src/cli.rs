//! Command-line interface implementation

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::collection::{read_artifact, Collection, CollectionWriter};
use crate::import::{load_png, name_from_path};
use crate::output::save_png;
use crate::seed::{Entropy, FixedCounts, FixedEntropy, SeedGenerator, TraitCounts};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// Traitforge - encode pixel-art trait layers and derive trait seeds
#[derive(Parser)]
#[command(name = "tfg")]
#[command(about = "Traitforge - encode pixel-art trait layers and derive trait seeds")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run-length encode PNG layers into a collection artifact
    Encode {
        /// Input PNG files or glob patterns (e.g. "layers/*.png").
        /// Matches are sorted so palette assignment is reproducible.
        inputs: Vec<String>,

        /// Output artifact path
        #[arg(short, long, default_value = "collection.json")]
        output: PathBuf,

        /// Crop each layer to its non-transparent bounds, recording the
        /// offset in the encoded header
        #[arg(long)]
        trim: bool,
    },

    /// Decode entries from a collection artifact back to PNG
    Decode {
        /// Collection artifact produced by `encode`
        artifact: PathBuf,

        /// Only decode the entry with this name
        #[arg(short, long)]
        name: Option<String>,

        /// Output directory for decoded PNGs (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Derive the trait seed for a token identifier
    Seed {
        /// Token identifier
        token_id: u64,

        /// Entropy value as 64 hex digits (e.g. a recent block hash)
        #[arg(short, long)]
        entropy: String,

        /// Per-layer variant counts: background,body,accessory,head,glasses
        #[arg(short, long)]
        counts: String,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            inputs,
            output,
            trim,
        } => run_encode(&inputs, &output, trim),
        Commands::Decode {
            artifact,
            name,
            output,
        } => run_decode(&artifact, name.as_deref(), output.as_deref()),
        Commands::Seed {
            token_id,
            entropy,
            counts,
        } => run_seed(token_id, &entropy, &counts),
    }
}

/// Expand input arguments, treating each as a glob pattern. Results are
/// sorted so the shared palette gets the same first-seen order every run.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    for pattern in inputs {
        let matches =
            glob::glob(pattern).map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
        let mut matched = false;
        for entry in matches {
            let path = entry.map_err(|e| format!("cannot read '{}': {}", pattern, e))?;
            matched = true;
            paths.push(path);
        }
        if !matched {
            return Err(format!("no files match '{}'", pattern));
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn run_encode(inputs: &[String], output: &Path, trim: bool) -> ExitCode {
    if inputs.is_empty() {
        eprintln!("Error: no input files given");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    let paths = match expand_inputs(inputs) {
        Ok(paths) => paths,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    // Loading and PNG decoding is read-only and parallelizes freely;
    // palette registration below stays sequential in sorted path order.
    let loaded: Vec<_> = paths
        .par_iter()
        .map(|path| load_png(path).map(|grid| (name_from_path(path), grid)))
        .collect();

    let mut collection = Collection::new();
    for result in loaded {
        let (name, grid) = match result {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        let encoded = if trim {
            collection.encode_image_trimmed(&name, &grid)
        } else {
            collection.encode_image(&name, &grid)
        };
        if let Err(e) = encoded {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let count = collection.len();
    let palette_size = collection.registry().len();
    if let Err(e) = CollectionWriter::new(collection).write(output) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    eprintln!(
        "Encoded {} image(s) with a {}-color palette to {}",
        count,
        palette_size,
        output.display()
    );
    ExitCode::from(EXIT_SUCCESS)
}

fn run_decode(artifact_path: &Path, name: Option<&str>, output: Option<&Path>) -> ExitCode {
    let artifact = match read_artifact(artifact_path) {
        Ok(artifact) => artifact,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let decoded = match name {
        Some(name) => match artifact.decode(name) {
            Ok(image) => vec![(name.to_string(), image)],
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => match artifact.decode_all() {
            Ok(images) => images,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
    };

    let out_dir = output.unwrap_or(Path::new("."));
    for (name, image) in &decoded {
        let path = out_dir.join(format!("{}.png", name));
        if let Err(e) = save_png(&image.grid, &path) {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }
    eprintln!("Decoded {} image(s) to {}", decoded.len(), out_dir.display());
    ExitCode::from(EXIT_SUCCESS)
}

fn run_seed(token_id: u64, entropy_hex: &str, counts_arg: &str) -> ExitCode {
    let entropy = match parse_entropy(entropy_hex) {
        Ok(entropy) => entropy,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let counts = match parse_counts(counts_arg) {
        Ok(counts) => counts,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let generator = SeedGenerator::new(FixedEntropy(entropy), FixedCounts(counts));
    match generator.generate(token_id) {
        Ok(seed) => match serde_json::to_string_pretty(&seed) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Parse a 64-hex-digit entropy value (leading `0x` accepted).
fn parse_entropy(s: &str) -> Result<Entropy, String> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() != 64 {
        return Err(format!(
            "entropy must be 64 hex digits, got {}",
            digits.len()
        ));
    }
    let mut entropy = [0u8; 32];
    for (i, byte) in entropy.iter_mut().enumerate() {
        let pair = &digits[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| format!("invalid hex in entropy: '{}'", pair))?;
    }
    Ok(entropy)
}

/// Parse "background,body,accessory,head,glasses" variant counts.
fn parse_counts(s: &str) -> Result<TraitCounts, String> {
    let fields: Vec<&str> = s.split(',').map(str::trim).collect();
    if fields.len() != 5 {
        return Err(format!("expected 5 comma-separated counts, got {}", fields.len()));
    }
    let mut values = [0u64; 5];
    for (value, field) in values.iter_mut().zip(&fields) {
        *value = field
            .parse()
            .map_err(|_| format!("invalid count '{}'", field))?;
    }
    Ok(TraitCounts::new(
        values[0], values[1], values[2], values[3], values[4],
    ))
}
