//! Traitforge - Command-line tool for encoding trait layers and deriving seeds

use std::process::ExitCode;

use traitforge::cli;

fn main() -> ExitCode {
    cli::run()
}
