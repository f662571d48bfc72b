//! # Content Provider Configuration
//!
//! This module defines the data structures that represent the content
//! provider document (`content_providers.json`), as well as the logic for
//! parsing it.
//!
//! ## Document Format
//!
//! The document is a JSON object keyed by provider name. Each entry names
//! the URL prefix it serves and exactly one backend block:
//!
//! ```json
//! {
//!   "cr-extensions": {
//!     "serveFrom": "extensions",
//!     "chromium": { "dir": "chrome/common/extensions/docs/templates" },
//!     "defaultExtensions": [".html", ".md"],
//!     "supportsTemplates": true
//!   },
//!   "samples": {
//!     "serveFrom": "samples",
//!     "gcs": { "bucket": "gs://extension-samples", "dir": "zips" },
//!     "supportsZip": true
//!   }
//! }
//! ```
//!
//! ## Parsing
//!
//! [`ProviderDocument::parse`] validates entries one at a time. A malformed
//! entry becomes a [`Error::Configuration`] stored under its name rather than
//! failing the whole document, so the router can log it and keep serving
//! every other provider.

use crate::defaults::BUCKET_SCHEME;
use crate::error::{Error, Result};
use crate::schema::strip_comments;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a provider's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendSpec {
    /// A subdirectory of the host backend.
    Chroot { dir: String },
    /// An object-store bucket (name without its scheme), optionally
    /// restricted to a subdirectory.
    ObjectStore { bucket: String, dir: Option<String> },
}

/// One validated provider entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub name: String,
    /// Request-path prefix, without leading or trailing `/`. Empty serves
    /// from the root.
    pub serve_from: String,
    pub backend: BackendSpec,
    /// Extensions tried, in order, for extension-less requests.
    pub default_extensions: Vec<String>,
    pub supports_templates: bool,
    pub supports_zip: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawProvider {
    serve_from: Option<String>,
    chromium: Option<RawChromium>,
    gcs: Option<RawGcs>,
    #[serde(default)]
    default_extensions: Vec<String>,
    #[serde(default)]
    supports_templates: bool,
    #[serde(default)]
    supports_zip: bool,
}

#[derive(Debug, Deserialize)]
struct RawChromium {
    dir: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGcs {
    bucket: Option<String>,
    #[serde(default)]
    dir: Option<String>,
}

fn config_error(name: &str, message: impl Into<String>, hint: &str) -> Error {
    Error::Configuration {
        provider: name.to_string(),
        message: message.into(),
        hint: Some(hint.to_string()),
    }
}

impl ProviderConfig {
    /// Validate the entry `name` of the provider document.
    pub fn from_value(name: &str, value: serde_json::Value) -> Result<Self> {
        let raw: RawProvider = serde_json::from_value(value).map_err(|e| Error::configuration(name, e.to_string()))?;

        let serve_from = raw.serve_from.ok_or_else(|| {
            config_error(
                name,
                "missing \"serveFrom\"",
                "Add \"serveFrom\": \"\" to serve from the root",
            )
        })?;

        let backend = match (raw.chromium, raw.gcs) {
            (Some(chromium), None) => BackendSpec::Chroot {
                dir: chromium.dir.ok_or_else(|| {
                    config_error(name, "\"chromium\" has no \"dir\"", "Add \"dir\" to the chromium block")
                })?,
            },
            (None, Some(gcs)) => {
                let bucket = gcs.bucket.ok_or_else(|| {
                    config_error(name, "\"gcs\" has no \"bucket\"", "Add \"bucket\": \"gs://<name>\"")
                })?;
                let bucket = bucket.strip_prefix(BUCKET_SCHEME).ok_or_else(|| {
                    config_error(
                        name,
                        format!("bucket \"{}\" does not start with {}", bucket, BUCKET_SCHEME),
                        "Prefix the bucket name with gs://",
                    )
                })?;
                if bucket.is_empty() {
                    return Err(Error::configuration(name, "bucket name is empty"));
                }
                BackendSpec::ObjectStore {
                    bucket: bucket.trim_end_matches('/').to_string(),
                    dir: gcs.dir.filter(|dir| !dir.is_empty()),
                }
            }
            (None, None) => {
                return Err(config_error(
                    name,
                    "no backend block",
                    "Add either a \"chromium\" or a \"gcs\" block",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(config_error(
                    name,
                    "both \"chromium\" and \"gcs\" are set",
                    "Keep exactly one backend block",
                ))
            }
        };

        if let Some(bad) = raw.default_extensions.iter().find(|ext| !ext.starts_with('.')) {
            return Err(config_error(
                name,
                format!("default extension \"{}\" does not start with '.'", bad),
                "Write extensions as \".html\"",
            ));
        }

        Ok(ProviderConfig {
            name: name.to_string(),
            serve_from: serve_from.trim_matches('/').to_string(),
            backend,
            default_extensions: raw.default_extensions,
            supports_templates: raw.supports_templates,
            supports_zip: raw.supports_zip,
        })
    }
}

/// A parsed provider document: every entry, valid or not.
#[derive(Debug, Clone, Default)]
pub struct ProviderDocument {
    entries: BTreeMap<String, Result<ProviderConfig>>,
}

impl ProviderDocument {
    /// Parse a provider document. Only a document that is not a JSON object
    /// fails as a whole.
    pub fn parse(json: &str) -> Result<Self> {
        let values: BTreeMap<String, serde_json::Value> = serde_json::from_str(&strip_comments(json))?;
        let entries = values
            .into_iter()
            .map(|(name, value)| {
                let config = ProviderConfig::from_value(&name, value);
                (name, config)
            })
            .collect();
        Ok(Self { entries })
    }

    /// The entry `name`: `None` if absent, `Some(Err)` if malformed.
    pub fn get(&self, name: &str) -> Option<&Result<ProviderConfig>> {
        self.entries.get(name)
    }

    /// Every provider name in the document, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Valid entries, sorted by name.
    pub fn valid(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.entries.values().filter_map(|entry| entry.as_ref().ok())
    }

    /// The name of the valid provider serving exactly `prefix`.
    pub fn name_serving(&self, prefix: &str) -> Option<&str> {
        self.valid()
            .find(|config| config.serve_from == prefix)
            .map(|config| config.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
