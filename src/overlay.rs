//! # Patch Overlay Filesystem
//!
//! [`PatchedFS`] layers an immutable [`PatchDescriptor`] on top of a base
//! [`StorageBackend`] and answers `stat`/`read` as if the patch had been
//! applied.
//!
//! ## Resolution rules
//!
//! - A path that is deleted, or lies under a deleted directory, is always
//!   `NotFound`.
//! - An added or modified file reads from the patch and has the patch
//!   version.
//! - A directory whose subtree the patch touches gets a rebuilt listing: the
//!   base listing minus deleted children plus children implied by added or
//!   modified paths (intermediate directories are synthesized when the base
//!   has none). Its version, and the version of every touched child, is the
//!   patch version. Untouched children keep their base versions.
//! - Everything else passes straight through to the base backend, so
//!   unaffected subtrees keep their stable base versions as cache keys.

use crate::error::{Error, Result};
use crate::filesystem::{Content, StatInfo, StorageBackend};
use crate::path::{ancestor_directories, is_directory, join};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// An immutable, versioned set of path-level changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    version_id: String,
    added: BTreeSet<String>,
    deleted: BTreeSet<String>,
    modified: BTreeSet<String>,
    content: BTreeMap<String, Vec<u8>>,
}

/// On-disk JSON form of a patch: added and modified files carry their
/// content inline.
#[derive(Debug, Deserialize)]
struct PatchFile {
    version: String,
    #[serde(default)]
    added: BTreeMap<String, String>,
    #[serde(default)]
    modified: BTreeMap<String, String>,
    #[serde(default)]
    deleted: Vec<String>,
}

impl PatchDescriptor {
    /// Build a patch. `content` must cover every added and modified path,
    /// and added or modified paths must name files.
    pub fn new(
        version_id: impl Into<String>,
        added: impl IntoIterator<Item = String>,
        deleted: impl IntoIterator<Item = String>,
        modified: impl IntoIterator<Item = String>,
        content: BTreeMap<String, Vec<u8>>,
    ) -> Result<Self> {
        let patch = Self {
            version_id: version_id.into(),
            added: added.into_iter().collect(),
            deleted: deleted.into_iter().collect(),
            modified: modified.into_iter().collect(),
            content,
        };
        for path in patch.added.iter().chain(&patch.modified) {
            if is_directory(path) {
                return Err(Error::validation(path.as_str(), "only files can be added or modified"));
            }
            if !patch.content.contains_key(path) {
                return Err(Error::validation(path.as_str(), "patch has no content for this path"));
            }
        }
        Ok(patch)
    }

    /// Parse the JSON patch format:
    /// `{"version": "...", "added": {path: text}, "modified": {path: text}, "deleted": [path]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: PatchFile = serde_json::from_str(json)?;
        let added: Vec<String> = file.added.keys().cloned().collect();
        let modified: Vec<String> = file.modified.keys().cloned().collect();
        let content = file
            .added
            .into_iter()
            .chain(file.modified)
            .map(|(path, text)| (path, text.into_bytes()))
            .collect();
        Self::new(file.version, added, file.deleted, modified, content)
    }

    /// Version assigned to everything the patch affects.
    pub fn version_id(&self) -> &str {
        &self.version_id
    }

    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    pub fn deleted(&self) -> &BTreeSet<String> {
        &self.deleted
    }

    pub fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    /// Whether `path` or one of its ancestor directories is deleted.
    pub fn is_deleted(&self, path: &str) -> bool {
        self.deleted.contains(path)
            || ancestor_directories(path)
                .into_iter()
                .any(|ancestor| self.deleted.contains(ancestor))
    }

    /// Patched content of an added or modified file.
    pub fn content_of(&self, path: &str) -> Option<&[u8]> {
        if self.added.contains(path) || self.modified.contains(path) {
            self.content.get(path).map(Vec::as_slice)
        } else {
            None
        }
    }

    fn written_paths(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(&self.modified)
    }

    /// Whether the patch changes anything strictly below `directory`.
    fn touches_below(&self, directory: &str) -> bool {
        self.written_paths()
            .chain(&self.deleted)
            .any(|path| path.len() > directory.len() && path.starts_with(directory))
    }

    /// Whether the effective version of `path` differs from the base.
    fn affects(&self, path: &str) -> bool {
        if is_directory(path) {
            self.touches_below(path)
        } else {
            self.content_of(path).is_some()
        }
    }

    /// Direct children of `directory` implied by added or modified paths.
    fn implied_children(&self, directory: &str) -> BTreeSet<String> {
        self.written_paths()
            .filter_map(|path| path.strip_prefix(directory))
            .filter(|rest| !rest.is_empty())
            .map(|rest| match rest.find('/') {
                Some(slash) => rest[..=slash].to_string(),
                None => rest.to_string(),
            })
            .collect()
    }
}

/// A [`StorageBackend`] presenting `base` with a patch applied.
pub struct PatchedFS {
    base: Arc<dyn StorageBackend>,
    patch: Arc<PatchDescriptor>,
}

impl PatchedFS {
    pub fn new(base: Arc<dyn StorageBackend>, patch: Arc<PatchDescriptor>) -> Self {
        Self { base, patch }
    }

    pub fn patch(&self) -> &PatchDescriptor {
        &self.patch
    }

    /// Effective `name -> version` children of a touched directory.
    fn patched_children(&self, directory: &str) -> Result<BTreeMap<String, String>> {
        let base_children = match self.base.stat(directory) {
            Ok(stat) => Some(stat.child_versions.unwrap_or_default()),
            Err(error) if error.is_not_found() => None,
            Err(error) => return Err(error),
        };
        let implied = self.patch.implied_children(directory);
        if base_children.is_none() && implied.is_empty() {
            return Err(Error::not_found(directory));
        }

        let patch_version = self.patch.version_id();
        let mut children = BTreeMap::new();
        for (name, version) in base_children.into_iter().flatten() {
            let child = join(directory, &name);
            if self.patch.is_deleted(&child) {
                continue;
            }
            let version = if self.patch.affects(&child) {
                patch_version.to_string()
            } else {
                version
            };
            children.insert(name, version);
        }
        for name in implied {
            children.insert(name, patch_version.to_string());
        }
        Ok(children)
    }
}

impl StorageBackend for PatchedFS {
    fn stat(&self, path: &str) -> Result<StatInfo> {
        if self.patch.is_deleted(path) {
            return Err(Error::not_found(path));
        }
        if !is_directory(path) {
            return match self.patch.content_of(path) {
                Some(_) => Ok(StatInfo::file(self.patch.version_id())),
                None => self.base.stat(path),
            };
        }
        if !self.patch.touches_below(path) {
            return self.base.stat(path);
        }
        let children = self.patched_children(path)?;
        Ok(StatInfo::directory(self.patch.version_id(), children))
    }

    fn read(&self, paths: &[String]) -> Result<BTreeMap<String, Content>> {
        let mut contents = BTreeMap::new();
        let mut passthrough = Vec::new();

        for path in paths {
            if self.patch.is_deleted(path) {
                return Err(Error::not_found(path.as_str()));
            }
            if is_directory(path) {
                if self.patch.touches_below(path) {
                    let names = self.patched_children(path)?.into_keys().collect();
                    contents.insert(path.clone(), Content::Directory(names));
                } else {
                    passthrough.push(path.clone());
                }
            } else if let Some(bytes) = self.patch.content_of(path) {
                contents.insert(path.clone(), Content::File(bytes.to_vec()));
            } else {
                passthrough.push(path.clone());
            }
        }

        if !passthrough.is_empty() {
            contents.extend(self.base.read(&passthrough)?);
        }
        Ok(contents)
    }
}
