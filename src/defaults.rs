//! Default values for docserve.
//!
//! This module provides centralized default values used across the library
//! and the command-line tool, ensuring consistency and avoiding duplication.

/// Path of the content provider document, relative to the host root.
pub const CONTENT_PROVIDERS_PATH: &str = "content_providers.json";

/// Path of the API feature dataset, relative to the host root.
pub const API_FEATURES_PATH: &str = "chrome/common/extensions/api/_api_features.json";

/// Directories searched for API description files, in priority order.
pub const API_ROOTS: &[&str] = &["chrome/common/extensions/api/", "extensions/common/api/"];

/// Extensions an API description file may carry, in priority order.
pub const SCHEMA_EXTENSIONS: &[&str] = &[".json", ".idl"];

/// Longest key the object store accepts. Longer keys are truncated.
pub const OBJECT_STORE_KEY_LIMIT: usize = 400;

/// Scheme every object-store bucket name must start with.
pub const BUCKET_SCHEME: &str = "gs://";

/// File name a directory request falls back to, before a default extension.
pub const INDEX_NAME: &str = "index";

/// Returns [`API_ROOTS`] as owned strings.
pub fn api_roots() -> Vec<String> {
    API_ROOTS.iter().map(|root| root.to_string()).collect()
}

/// Returns [`SCHEMA_EXTENSIONS`] as owned strings.
pub fn schema_extensions() -> Vec<String> {
    SCHEMA_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}
