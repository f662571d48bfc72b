//! # Stat Command Implementation
//!
//! Prints the version information of one path, after any patch overlay, as
//! JSON. Directories include the version of each direct child.

use anyhow::{Context as _, Result};
use clap::Args;

use docserve::filesystem::StorageBackend;

use super::Context;

/// Print the version information of a path
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Path relative to the root; directories end with '/'
    #[arg(value_name = "PATH", default_value = "")]
    pub path: String,
}

/// Execute the `stat` command.
pub fn execute(context: &Context, args: StatArgs) -> Result<()> {
    let stat = context
        .host
        .stat(&args.path)
        .with_context(|| format!("Cannot stat \"{}\"", args.path))?;
    println!("{}", serde_json::to_string_pretty(&stat)?);
    Ok(())
}
