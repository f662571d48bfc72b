//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `docserve` command-line tool. Each subcommand is defined in its own file
//! to keep the logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the shared [`Context`] and the parsed
//!   `Args` and performs the command's logic.
//!
//! The [`Context`] is built once from the global flags: the host directory,
//! the optional patch overlaid on it, and the bucket directory used by
//! object-store providers.

pub mod model;
pub mod refresh;
pub mod resolve;
pub mod route;
pub mod stat;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use log::debug;

use docserve::api_models::{ApiFeatures, ApiModels};
use docserve::backends::{LocalBuckets, LocalFS};
use docserve::cache::CompiledCacheFactory;
use docserve::defaults;
use docserve::filesystem::StorageBackend;
use docserve::overlay::{PatchDescriptor, PatchedFS};
use docserve::router::ContentProviders;
use docserve::schema::JsonSchemaParser;

/// State shared by every subcommand.
pub struct Context {
    pub host: Arc<dyn StorageBackend>,
    pub buckets: Arc<LocalBuckets>,
    pub factory: CompiledCacheFactory,
}

impl Context {
    /// Serve `root`, overlaid with the patch at `patch` when given.
    pub fn open(root: &Path, patch: Option<&Path>, buckets: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("Root directory not found: {}", root.display());
        }
        let mut host: Arc<dyn StorageBackend> = Arc::new(LocalFS::new(root));

        if let Some(patch_path) = patch {
            let json = std::fs::read_to_string(patch_path)
                .with_context(|| format!("Failed to read patch file {}", patch_path.display()))?;
            let descriptor = PatchDescriptor::from_json(&json)
                .with_context(|| format!("Invalid patch file {}", patch_path.display()))?;
            debug!("overlaying patch {}", descriptor.version_id());
            host = Arc::new(PatchedFS::new(host, Arc::new(descriptor)));
        }

        Ok(Self {
            host,
            buckets: Arc::new(LocalBuckets::new(buckets)),
            factory: CompiledCacheFactory::new(),
        })
    }

    /// The content router over the host's provider document.
    pub fn providers(&self) -> ContentProviders {
        ContentProviders::new(
            Arc::clone(&self.host),
            self.buckets.clone(),
            self.factory.clone(),
            defaults::CONTENT_PROVIDERS_PATH,
        )
    }

    /// API model lookup over the host, pruned for `platform`.
    ///
    /// A missing feature dataset yields an empty one, so models can still be
    /// looked up by name.
    pub fn api_models(&self, platform: Option<&str>) -> Result<ApiModels> {
        let features = match ApiFeatures::load(self.host.as_ref(), defaults::API_FEATURES_PATH) {
            Ok(features) => features,
            Err(e) if e.is_not_found() => {
                debug!("no feature dataset at {}", defaults::API_FEATURES_PATH);
                ApiFeatures::default()
            }
            Err(e) => return Err(e).context("Failed to load the API feature dataset"),
        };
        Ok(ApiModels::new(
            Arc::clone(&self.host),
            &self.factory,
            Arc::new(JsonSchemaParser),
            features,
            platform,
        ))
    }
}
