//! Concrete storage backends used by content providers
//!
//! - [`ChrootFS`] restricts another backend to one of its subdirectories.
//! - [`LocalFS`] serves a directory on the host disk.
//! - [`BucketProvider`] binds object-store bucket names to backends, with
//!   [`LocalBuckets`] (directories on disk) and [`MemoryBuckets`]
//!   implementations.

use crate::error::{Error, Result};
use crate::filesystem::{Content, StatInfo, StorageBackend};
use crate::path::{is_directory, to_directory};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

/// A view of `base` rooted at one of its subdirectories.
pub struct ChrootFS {
    base: Arc<dyn StorageBackend>,
    root: String,
}

impl ChrootFS {
    /// Restrict `base` to the directory `root`.
    pub fn new(base: Arc<dyn StorageBackend>, root: &str) -> Self {
        let root = root.trim_start_matches('/');
        Self {
            base,
            root: to_directory(root),
        }
    }

    /// The directory of the base backend this view is rooted at.
    pub fn root(&self) -> &str {
        &self.root
    }

    fn to_base(&self, path: &str) -> String {
        format!("{}{}", self.root, path.trim_start_matches('/'))
    }
}

impl StorageBackend for ChrootFS {
    fn stat(&self, path: &str) -> Result<StatInfo> {
        self.base.stat(&self.to_base(path))
    }

    fn read(&self, paths: &[String]) -> Result<BTreeMap<String, Content>> {
        let base_paths: Vec<String> = paths.iter().map(|path| self.to_base(path)).collect();
        let mut base_contents = self.base.read(&base_paths)?;
        let mut contents = BTreeMap::new();
        for (path, base_path) in paths.iter().zip(&base_paths) {
            let content = base_contents
                .remove(base_path)
                .ok_or_else(|| Error::not_found(path.as_str()))?;
            contents.insert(path.clone(), content);
        }
        Ok(contents)
    }
}

/// Read-only view of a directory on the host disk.
///
/// Versions are derived from modification times, so they change whenever
/// the file (or, for a directory, its entry list) changes on disk.
#[derive(Debug, Clone)]
pub struct LocalFS {
    root: PathBuf,
}

impl LocalFS {
    /// Serve the directory `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = path.trim_end_matches('/');
        // Only plain names: `..`, `.`, absolute paths and drive prefixes
        // would escape or alias the root.
        if !Path::new(relative)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(Error::validation(path, "only paths relative to the root are allowed"));
        }
        Ok(if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(relative)
        })
    }

    fn metadata(&self, path: &str) -> Result<fs::Metadata> {
        let metadata = fs::metadata(self.resolve(path)?).map_err(|e| map_io(path, e))?;
        if metadata.is_dir() != is_directory(path) {
            return Err(Error::not_found(path));
        }
        Ok(metadata)
    }

    fn list(&self, path: &str) -> Result<Vec<(String, fs::Metadata)>> {
        let entries = fs::read_dir(self.resolve(path)?).map_err(|e| map_io(path, e))?;
        let mut children = Vec::new();
        for entry in entries {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if metadata.is_dir() {
                name.push('/');
            }
            children.push((name, metadata));
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children)
    }
}

fn map_io(path: &str, error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::NotFound {
        Error::not_found(path)
    } else {
        error.into()
    }
}

fn mtime_version(metadata: &fs::Metadata) -> String {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_nanos().to_string())
        .unwrap_or_else(|| "0".to_string())
}

impl StorageBackend for LocalFS {
    fn stat(&self, path: &str) -> Result<StatInfo> {
        let metadata = self.metadata(path)?;
        if !metadata.is_dir() {
            return Ok(StatInfo::file(mtime_version(&metadata)));
        }
        let child_versions = self
            .list(path)?
            .into_iter()
            .map(|(name, child)| (name, mtime_version(&child)))
            .collect();
        Ok(StatInfo::directory(mtime_version(&metadata), child_versions))
    }

    fn read(&self, paths: &[String]) -> Result<BTreeMap<String, Content>> {
        let mut contents = BTreeMap::new();
        for path in paths {
            let metadata = self.metadata(path)?;
            let content = if metadata.is_dir() {
                Content::Directory(self.list(path)?.into_iter().map(|(name, _)| name).collect())
            } else {
                Content::File(fs::read(self.resolve(path)?).map_err(|e| map_io(path, e))?)
            };
            contents.insert(path.clone(), content);
        }
        Ok(contents)
    }
}

/// Binds object-store bucket names to storage backends.
pub trait BucketProvider: Send + Sync {
    /// Open the bucket named `bucket` (without its URL scheme).
    fn open(&self, bucket: &str) -> Result<Arc<dyn StorageBackend>>;
}

/// Serves each bucket from a same-named directory under a local root.
///
/// This is the development stand-in for a real object store.
#[derive(Debug, Clone)]
pub struct LocalBuckets {
    root: PathBuf,
}

impl LocalBuckets {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl BucketProvider for LocalBuckets {
    fn open(&self, bucket: &str) -> Result<Arc<dyn StorageBackend>> {
        Ok(Arc::new(LocalFS::new(self.root.join(bucket))))
    }
}

/// Buckets registered in memory, for tests and embedding.
#[derive(Default)]
pub struct MemoryBuckets {
    buckets: Mutex<HashMap<String, Arc<dyn StorageBackend>>>,
}

impl MemoryBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `bucket`.
    pub fn insert(&self, bucket: &str, backend: Arc<dyn StorageBackend>) -> Result<()> {
        let mut buckets = self.buckets.lock().map_err(|_| Error::LockPoisoned {
            context: "MemoryBuckets".to_string(),
        })?;
        buckets.insert(bucket.to_string(), backend);
        Ok(())
    }
}

impl BucketProvider for MemoryBuckets {
    fn open(&self, bucket: &str) -> Result<Arc<dyn StorageBackend>> {
        let buckets = self.buckets.lock().map_err(|_| Error::LockPoisoned {
            context: "MemoryBuckets".to_string(),
        })?;
        buckets
            .get(bucket)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("gs://{}", bucket)))
    }
}
