//! # Refresh Command Implementation
//!
//! Builds every content provider named in the provider document and warms
//! its cache. A provider that cannot be built or refreshed is reported on
//! stderr (through the logger) and skipped; `--ignore-missing` silences
//! those reports. With `--models`, every API model in the feature dataset
//! is loaded as well.

use anyhow::{Context as _, Result};
use clap::Args;

use super::Context;

/// Build and warm every content provider
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Do not report providers that fail to build or refresh
    #[arg(long)]
    pub ignore_missing: bool,

    /// Also load every API model named in the feature dataset
    #[arg(long)]
    pub models: bool,

    /// Prune models for this platform (with `--models`)
    #[arg(long, value_name = "PLATFORM", env = "DOCSERVE_PLATFORM")]
    pub platform: Option<String>,
}

/// Execute the `refresh` command.
pub fn execute(context: &Context, args: RefreshArgs) -> Result<()> {
    let refreshed = context
        .providers()
        .refresh(args.ignore_missing)
        .get()
        .context("Failed to refresh content providers")?;

    println!("Refreshed {} content provider(s)", refreshed.len());
    for name in &refreshed {
        println!("  {}", name);
    }

    if args.models {
        let models = context.api_models(args.platform.as_deref())?;
        let loaded = models.refresh().get().context("Failed to load API models")?;
        let found = loaded.iter().filter(|model| model.is_some()).count();
        println!("Loaded {} of {} API model(s)", found, loaded.len());
    }
    Ok(())
}
