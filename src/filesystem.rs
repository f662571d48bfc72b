//! Storage backend abstraction and an in-memory implementation
//!
//! Every component in this crate reads content through [`StorageBackend`]:
//! the overlay filesystem wraps one, the compiled cache consumes one, and
//! content providers are built on top of one. Directories are addressed by
//! paths ending in `/` (the root is `""`) and read back as listings of
//! child names, with subdirectories keeping their trailing `/`.

use crate::error::{Error, Result};
use crate::path::{ancestor_directories, is_directory, join};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Version information for a file or directory.
///
/// For a directory `child_versions` holds one entry per direct child, keyed
/// by the child's listing name. For a file it is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatInfo {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_versions: Option<BTreeMap<String, String>>,
}

impl StatInfo {
    /// Stat result for a file.
    pub fn file(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            child_versions: None,
        }
    }

    /// Stat result for a directory.
    pub fn directory(version: impl Into<String>, child_versions: BTreeMap<String, String>) -> Self {
        Self {
            version: version.into(),
            child_versions: Some(child_versions),
        }
    }
}

/// The result of reading a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Bytes of a file.
    File(Vec<u8>),
    /// Sorted names of a directory's direct children.
    Directory(Vec<String>),
}

impl Content {
    /// File bytes, or `None` for a listing.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Content::File(bytes) => Some(bytes),
            Content::Directory(_) => None,
        }
    }

    /// Directory listing, or `None` for a file.
    pub fn as_listing(&self) -> Option<&[String]> {
        match self {
            Content::File(_) => None,
            Content::Directory(names) => Some(names),
        }
    }

    /// File bytes for `path`, failing with a validation error on a listing.
    pub fn into_bytes(self, path: &str) -> Result<Vec<u8>> {
        match self {
            Content::File(bytes) => Ok(bytes),
            Content::Directory(_) => Err(Error::validation(path, "expected a file, found a directory")),
        }
    }
}

/// A read-only, versioned source of files and directory listings.
///
/// All operations fail with [`Error::NotFound`] when a path does not exist.
pub trait StorageBackend: Send + Sync {
    /// Version information for `path`.
    fn stat(&self, path: &str) -> Result<StatInfo>;

    /// Read several paths at once.
    fn read(&self, paths: &[String]) -> Result<BTreeMap<String, Content>>;

    /// Read one path.
    fn read_single(&self, path: &str) -> Result<Content> {
        let mut contents = self.read(&[path.to_string()])?;
        contents
            .remove(path)
            .ok_or_else(|| Error::not_found(path))
    }

    /// Whether `path` exists. Errors other than `NotFound` propagate.
    fn exists(&self, path: &str) -> Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }
}

/// Every file path below the directory `root`, in listing order.
pub fn walk(backend: &dyn StorageBackend, root: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_string()];
    while let Some(directory) = pending.pop() {
        let listing = backend.read_single(&directory)?;
        let names = listing
            .as_listing()
            .ok_or_else(|| Error::validation(&directory, "expected a directory listing"))?;
        // Reverse so the stack pops subdirectories in listing order.
        for name in names.iter().rev() {
            let child = join(&directory, name);
            if is_directory(&child) {
                pending.push(child);
            } else {
                files.push(child);
            }
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, Vec<u8>>,
    /// Explicitly created directories, which may be empty.
    directories: BTreeSet<String>,
    /// Version of every file and directory that has been touched.
    versions: BTreeMap<String, u64>,
    clock: u64,
}

impl MemoryState {
    /// Bump the clock and stamp `path` plus all of its ancestors.
    fn touch(&mut self, path: &str) {
        self.clock += 1;
        let clock = self.clock;
        self.versions.insert(path.to_string(), clock);
        self.versions.insert(String::new(), clock);
        for ancestor in ancestor_directories(path) {
            self.versions.insert(ancestor.to_string(), clock);
        }
    }

    fn directory_exists(&self, path: &str) -> bool {
        path.is_empty()
            || self.directories.contains(path)
            || self.files.keys().any(|file| file.starts_with(path))
            || self.directories.iter().any(|dir| dir.starts_with(path))
    }

    fn listing(&self, directory: &str) -> BTreeSet<String> {
        let all_paths = self.files.keys().chain(self.directories.iter());
        all_paths
            .filter_map(|path| path.strip_prefix(directory))
            .filter(|rest| !rest.is_empty())
            .map(|rest| match rest.find('/') {
                Some(slash) => rest[..=slash].to_string(),
                None => rest.to_string(),
            })
            .collect()
    }

    fn version_of(&self, path: &str) -> String {
        self.versions.get(path).copied().unwrap_or(0).to_string()
    }
}

/// In-memory storage backend.
///
/// Each write or removal advances a clock and stamps the written path and
/// every ancestor directory, so directory versions change whenever anything
/// below them changes. Stat and read calls are counted, which lets tests
/// assert how much work a caller really did.
#[derive(Debug, Default)]
pub struct MemoryFS {
    state: Mutex<MemoryState>,
    stat_count: AtomicUsize,
    read_count: AtomicUsize,
}

impl MemoryFS {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filesystem from `(path, content)` pairs.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let fs = Self::new();
        for (path, content) in files {
            fs.add_file_string(path, content)?;
        }
        Ok(fs)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "MemoryFS state".to_string(),
        })
    }

    /// Add or update a file
    pub fn add_file_content(&self, path: &str, content: Vec<u8>) -> Result<()> {
        if is_directory(path) {
            return Err(Error::validation(path, "file paths must not end with '/'"));
        }
        let mut state = self.lock()?;
        state.files.insert(path.to_string(), content);
        state.touch(path);
        Ok(())
    }

    /// Add or update a file with string content
    pub fn add_file_string(&self, path: &str, content: &str) -> Result<()> {
        self.add_file_content(path, content.as_bytes().to_vec())
    }

    /// Create a (possibly empty) directory
    pub fn add_directory(&self, path: &str) -> Result<()> {
        if !is_directory(path) {
            return Err(Error::validation(path, "directory paths must end with '/'"));
        }
        let mut state = self.lock()?;
        state.directories.insert(path.to_string());
        state.touch(path);
        Ok(())
    }

    /// Remove a file, returning its previous content
    pub fn remove_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let mut state = self.lock()?;
        let removed = state.files.remove(path);
        if removed.is_some() {
            state.touch(path);
            state.versions.remove(path);
        }
        Ok(removed)
    }

    /// Number of `stat` calls served so far
    pub fn stat_count(&self) -> usize {
        self.stat_count.load(Ordering::SeqCst)
    }

    /// Number of paths read so far
    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Reset both counters to zero
    pub fn reset_counts(&self) {
        self.stat_count.store(0, Ordering::SeqCst);
        self.read_count.store(0, Ordering::SeqCst);
    }
}

impl StorageBackend for MemoryFS {
    fn stat(&self, path: &str) -> Result<StatInfo> {
        self.stat_count.fetch_add(1, Ordering::SeqCst);
        let state = self.lock()?;

        if !is_directory(path) {
            return if state.files.contains_key(path) {
                Ok(StatInfo::file(state.version_of(path)))
            } else {
                Err(Error::not_found(path))
            };
        }

        if !state.directory_exists(path) {
            return Err(Error::not_found(path));
        }
        let child_versions = state
            .listing(path)
            .into_iter()
            .map(|name| {
                let version = state.version_of(&join(path, &name));
                (name, version)
            })
            .collect();
        Ok(StatInfo::directory(state.version_of(path), child_versions))
    }

    fn read(&self, paths: &[String]) -> Result<BTreeMap<String, Content>> {
        self.read_count.fetch_add(paths.len(), Ordering::SeqCst);
        let state = self.lock()?;
        let mut contents = BTreeMap::new();
        for path in paths {
            let content = if is_directory(path) {
                if !state.directory_exists(path) {
                    return Err(Error::not_found(path.as_str()));
                }
                Content::Directory(state.listing(path).into_iter().collect())
            } else {
                let bytes = state
                    .files
                    .get(path)
                    .ok_or_else(|| Error::not_found(path.as_str()))?;
                Content::File(bytes.clone())
            };
            contents.insert(path.clone(), content);
        }
        Ok(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryFS {
        MemoryFS::with_files([
            ("file.txt", "root file"),
            ("dir/a.txt", "a"),
            ("dir/sub/b.txt", "b"),
        ])
        .unwrap()
    }

    #[test]
    fn test_read_file_and_listing() {
        let fs = fixture();
        assert_eq!(
            fs.read_single("dir/a.txt").unwrap(),
            Content::File(b"a".to_vec())
        );
        assert_eq!(
            fs.read_single("dir/").unwrap(),
            Content::Directory(vec!["a.txt".to_string(), "sub/".to_string()])
        );
        assert_eq!(
            fs.read_single("").unwrap().as_listing().unwrap(),
            &["dir/".to_string(), "file.txt".to_string()]
        );
    }

    #[test]
    fn test_missing_paths_are_not_found() {
        let fs = fixture();
        assert!(fs.stat("nope.txt").unwrap_err().is_not_found());
        assert!(fs.stat("nope/").unwrap_err().is_not_found());
        assert!(fs.read_single("dir/missing.txt").unwrap_err().is_not_found());
        assert!(!fs.exists("nope.txt").unwrap());
        assert!(fs.exists("dir/sub/").unwrap());
    }

    #[test]
    fn test_directory_stat_lists_child_versions() {
        let fs = fixture();
        let stat = fs.stat("dir/").unwrap();
        let children = stat.child_versions.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains_key("a.txt"));
        assert!(children.contains_key("sub/"));
        assert!(fs.stat("file.txt").unwrap().child_versions.is_none());
    }

    #[test]
    fn test_writes_bump_ancestor_versions() {
        let fs = fixture();
        let dir_before = fs.stat("dir/").unwrap().version;
        let sub_before = fs.stat("dir/sub/").unwrap().version;
        let a_before = fs.stat("dir/a.txt").unwrap().version;

        fs.add_file_string("dir/sub/b.txt", "changed").unwrap();

        assert_ne!(fs.stat("dir/").unwrap().version, dir_before);
        assert_ne!(fs.stat("dir/sub/").unwrap().version, sub_before);
        assert_eq!(fs.stat("dir/a.txt").unwrap().version, a_before);
    }

    #[test]
    fn test_remove_file_and_empty_directory() {
        let fs = fixture();
        fs.add_directory("empty/").unwrap();
        assert_eq!(fs.read_single("empty/").unwrap(), Content::Directory(vec![]));

        assert!(fs.remove_file("dir/a.txt").unwrap().is_some());
        assert!(fs.stat("dir/a.txt").unwrap_err().is_not_found());
        assert!(fs.remove_file("dir/a.txt").unwrap().is_none());
    }

    #[test]
    fn test_counters() {
        let fs = fixture();
        fs.stat("dir/").unwrap();
        fs.read(&["dir/a.txt".to_string(), "file.txt".to_string()]).unwrap();
        assert_eq!(fs.stat_count(), 1);
        assert_eq!(fs.read_count(), 2);
        fs.reset_counts();
        assert_eq!(fs.read_count(), 0);
    }

    #[test]
    fn test_walk_lists_every_file() {
        let fs = fixture();
        assert_eq!(
            walk(&fs, "").unwrap(),
            vec!["dir/a.txt", "dir/sub/b.txt", "file.txt"]
        );
        assert_eq!(walk(&fs, "dir/sub/").unwrap(), vec!["dir/sub/b.txt"]);
    }

    #[test]
    fn test_file_paths_must_not_be_directories() {
        let fs = MemoryFS::new();
        assert!(fs.add_file_string("dir/", "x").is_err());
        assert!(fs.add_directory("dir").is_err());
    }
}
