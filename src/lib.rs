//! # docserve
//!
//! This library provides the content layer of a documentation server: a
//! versioned overlay filesystem, a single-flight compiled cache, a
//! prefix-based content router, API model lookup and a dotted-reference
//! resolver. It is used by the `docserve` command-line tool but can be
//! embedded in any server that needs to answer "what is at this path, at
//! which version" with correct cache invalidation.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use docserve::filesystem::{MemoryFS, StorageBackend};
//! use docserve::overlay::{PatchDescriptor, PatchedFS};
//!
//! let base = Arc::new(MemoryFS::with_files([
//!     ("docs/intro.md", "# Intro"),
//!     ("docs/old.md", "# Old"),
//! ]).unwrap());
//!
//! let patch = PatchDescriptor::from_json(r##"{
//!     "version": "patch-42",
//!     "modified": {"docs/intro.md": "# Better intro"},
//!     "deleted": ["docs/old.md"]
//! }"##).unwrap();
//!
//! let patched = PatchedFS::new(base, Arc::new(patch));
//! assert!(patched.stat("docs/old.md").unwrap_err().is_not_found());
//! assert_eq!(patched.stat("docs/").unwrap().version, "patch-42");
//! ```
//!
//! ## Core Concepts
//!
//! - **Lazy values (`future`)**: [`future::Future`] runs its producer once on
//!   first observation and replays the outcome. `then`, `all` and `race`
//!   compose lookups while tolerating selected error kinds.
//! - **Storage (`filesystem`, `backends`, `overlay`)**: every source of
//!   content implements [`filesystem::StorageBackend`] (`stat` + `read`).
//!   [`overlay::PatchedFS`] layers an immutable patch over a base backend and
//!   reports versions that change exactly where the patch changed something.
//! - **Compiled cache (`cache`)**: [`cache::CompiledCache`] memoizes a pure
//!   `compute(path, content)` per category and path, reusing an entry while
//!   the backend version is unchanged and sharing in-flight work.
//! - **Routing (`config`, `content_provider`, `router`)**: the provider
//!   document maps names to backends and `serveFrom` prefixes;
//!   [`router::ContentProviders`] resolves request paths by longest prefix.
//! - **API models (`schema`, `api_models`)**: API names are mapped to
//!   candidate description files, raced through the cache, parsed and pruned
//!   for a platform.
//! - **References (`reference`, `object_store`)**: dotted references such as
//!   `tabs.Tab` resolve to documentation links, cached in an object store.

pub mod api_models;
pub mod backends;
pub mod cache;
pub mod config;
pub mod content_provider;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod future;
pub mod object_store;
pub mod overlay;
pub mod path;
pub mod reference;
pub mod router;
pub mod schema;

#[cfg(test)]
mod path_proptest;
