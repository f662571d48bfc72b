//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_docs_site();
//!     fixture.command().arg("route").arg("extensions/intro").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::fixtures;
    pub use super::TestFixture;
}

/// Common documents used to populate fixtures.
#[allow(dead_code)]
pub mod fixtures {
    /// Provider document with a root provider, a nested mount, a chromium
    /// provider with default extensions and an object-store provider.
    pub const PROVIDERS: &str = r#"{
  "root": {
    "serveFrom": "",
    "chromium": {"dir": "docs/static"}
  },
  "extensions": {
    "serveFrom": "extensions",
    "chromium": {"dir": "docs/templates"},
    "defaultExtensions": [".html", ".md"],
    "supportsTemplates": true
  },
  "tomatoes": {
    "serveFrom": "tomatoes-dir/are/a",
    "chromium": {"dir": "docs/tomatoes"}
  },
  "samples": {
    "serveFrom": "samples",
    "gcs": {"bucket": "gs://sample-bucket", "dir": "zips"},
    "supportsZip": true
  },
  "misconfigured": {
    "serveFrom": "broken"
  }
}"#;

    /// Feature dataset naming the fixture APIs.
    pub const FEATURES: &str = r#"{
  // Feature dataset used by the reference tests.
  "tabs": {},
  "pageAction": {},
  "foo": {},
  "app": {},
  "app.window": {},
  "devtools.panels": [{"noparent": true}]
}"#;

    pub const TABS_API: &str = r#"[{
  "namespace": "tabs",
  "types": [
    {"id": "Tab", "type": "object", "properties": {"id": {"type": "integer"}}},
    {"id": "MutedInfo", "type": "object", "platforms": ["linux", "win", "mac"]}
  ],
  "functions": [{"name": "query", "type": "function"}],
  "events": [{"name": "onUpdated", "type": "function"}]
}]"#;

    pub const PAGE_ACTION_API: &str = r#"[{
  "namespace": "pageAction",
  "functions": [{"name": "show", "type": "function"}]
}]"#;

    pub const FOO_API: &str = r#"[{
  "namespace": "foo",
  "documentation_options": {"documented_in": "foo_guide"},
  "types": [
    {"id": "Baz", "type": "object", "properties": {"qux": {"type": "string"}}}
  ],
  "properties": {"bar": {"$ref": "Baz"}}
}]"#;
}

/// Directory, inside the fixture, that commands use as `--root`.
const ROOT_DIR: &str = "site";

/// A temporary documentation tree plus space for files that live outside
/// the served root (patch files, for instance).
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty root.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child(ROOT_DIR)
            .create_dir_all()
            .expect("Failed to create root directory");
        Self { temp_dir }
    }

    /// Add a file under the served root.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(ROOT_DIR)
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a file next to (not inside) the served root.
    #[allow(dead_code)]
    pub fn with_outside_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Populate the root with the provider document, provider content, API
    /// descriptions and the feature dataset from [`fixtures`].
    #[allow(dead_code)]
    pub fn with_docs_site(self) -> Self {
        self.with_file("content_providers.json", fixtures::PROVIDERS)
            .with_file("docs/static/index.html", "<h1>Home</h1>")
            .with_file("docs/static/css/site.css", "body { margin: 0 }")
            .with_file("docs/templates/intro.md", "# Introduction")
            .with_file("docs/templates/guide/index.html", "<h1>Guide</h1>")
            .with_file("docs/tomatoes/fruit", "tomatoes are a fruit")
            .with_file(".buckets/sample-bucket/zips/hello.zip", "PK")
            .with_file("chrome/common/extensions/api/_api_features.json", fixtures::FEATURES)
            .with_file("chrome/common/extensions/api/tabs.json", fixtures::TABS_API)
            .with_file("extensions/common/api/page_action.json", fixtures::PAGE_ACTION_API)
            .with_file("chrome/common/extensions/api/foo.json", fixtures::FOO_API)
    }

    /// The served root.
    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join(ROOT_DIR)
    }

    /// Path to the temporary directory holding the root.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command for the docserve binary with `--root` set.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("docserve");
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("DOCSERVE_ROOT")
            .env_remove("DOCSERVE_PATCH")
            .env_remove("DOCSERVE_BUCKETS")
            .env_remove("DOCSERVE_PLATFORM")
            .env_remove("RUST_LOG");
        cmd.arg("--root").arg(self.root());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_root() {
        let fixture = TestFixture::new();
        assert!(fixture.root().is_dir());
    }

    #[test]
    fn test_fixture_docs_site_documents_are_valid_json() {
        for document in [fixtures::TABS_API, fixtures::PAGE_ACTION_API, fixtures::FOO_API, fixtures::PROVIDERS] {
            serde_json::from_str::<serde_json::Value>(document).expect("fixture should be valid JSON");
        }
    }
}
