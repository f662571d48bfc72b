//! # docserve CLI
//!
//! This is the binary entry point for the `docserve` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Initializing logging.
//! - Executing the appropriate command based on the parsed arguments.
//!
//! The core logic lives in the `docserve` library crate; the binary is a thin
//! wrapper that wires a host directory (optionally overlaid with a patch) into
//! the library's router, model lookup and reference resolver.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.init_logging();
    cli.execute()
}
