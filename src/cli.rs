//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, Context};

/// docserve - Inspect a versioned documentation content tree
#[derive(Parser, Debug)]
#[command(name = "docserve")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Host directory the documentation tree is read from
    #[arg(long, global = true, value_name = "DIR", env = "DOCSERVE_ROOT", default_value = ".")]
    root: PathBuf,

    /// Patch descriptor (JSON) overlaid on the host directory
    #[arg(long, global = true, value_name = "FILE", env = "DOCSERVE_PATCH")]
    patch: Option<PathBuf>,

    /// Directory holding one subdirectory per object-store bucket.
    ///
    /// Defaults to `.buckets` under the root.
    #[arg(long, global = true, value_name = "DIR", env = "DOCSERVE_BUCKETS")]
    buckets: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the version information of a path as JSON
    Stat(commands::stat::StatArgs),

    /// Show which content provider serves a request path
    Route(commands::route::RouteArgs),

    /// Locate and summarize an API model
    Model(commands::model::ModelArgs),

    /// Resolve a dotted API reference to a link
    Resolve(commands::resolve::ResolveArgs),

    /// Build and warm every content provider
    Refresh(commands::refresh::RefreshArgs),
}

impl Cli {
    /// Initialize logging from `--log-level`. `RUST_LOG` still takes
    /// precedence when set.
    pub fn init_logging(&self) {
        let env = env_logger::Env::default().default_filter_or(self.log_level.as_str());
        // A logger may already be installed when embedded; keep that one.
        let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
    }

    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let buckets = self.buckets.unwrap_or_else(|| self.root.join(".buckets"));
        let context = Context::open(&self.root, self.patch.as_deref(), &buckets)?;

        match self.command {
            Commands::Stat(args) => commands::stat::execute(&context, args),
            Commands::Route(args) => commands::route::execute(&context, args),
            Commands::Model(args) => commands::model::execute(&context, args),
            Commands::Resolve(args) => commands::resolve::execute(&context, args),
            Commands::Refresh(args) => commands::refresh::execute(&context, args),
        }
    }
}
