//! Versioned, single-flight caching of values compiled from backend content
//!
//! A [`CompiledCache`] pairs a [`StorageBackend`] with a pure
//! `compute(path, content)` function. Entries are keyed by
//! `(category, path)` and remember the backend version they were compiled
//! from; an entry is only reused while `stat` still reports that version.
//!
//! Every [`CompiledCache`] made by one [`CompiledCacheFactory`] shares the
//! factory's entry table, which is why the category matters: it keeps
//! independent computations over the same paths apart.
//!
//! Requests for a key that is already being computed share the pending
//! [`Future`] rather than issuing a second read. Failures (including
//! `NotFound`) are never stored, so a later request retries.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::{Error, Result};
use crate::filesystem::{Content, StorageBackend};
use crate::future::Future;
use crate::path::to_directory;

/// Cache key combining a category and a backend path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub category: String,
    pub path: String,
}

impl CacheKey {
    pub fn new(category: &str, path: &str) -> Self {
        Self {
            category: category.to_string(),
            path: path.to_string(),
        }
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    version: String,
}

type EntryTable = Arc<Mutex<HashMap<CacheKey, CacheEntry>>>;

fn poisoned() -> Error {
    Error::LockPoisoned {
        context: "compiled cache".to_string(),
    }
}

/// Creates [`CompiledCache`]s that share one entry table.
#[derive(Clone, Default)]
pub struct CompiledCacheFactory {
    entries: EntryTable,
}

impl CompiledCacheFactory {
    /// Create a factory with an empty entry table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache of `compute` over `source`, scoped to `category`.
    pub fn create<V, F>(&self, source: Arc<dyn StorageBackend>, category: &str, compute: F) -> CompiledCache<V>
    where
        V: Clone + Send + Sync + 'static,
        F: Fn(&str, Content) -> Result<V> + Send + Sync + 'static,
    {
        self.create_versioned(source, category, move |path, content, _| compute(path, content))
    }

    /// Like [`CompiledCacheFactory::create`], but `compute` also receives
    /// the version the entry will be stored under.
    pub fn create_versioned<V, F>(&self, source: Arc<dyn StorageBackend>, category: &str, compute: F) -> CompiledCache<V>
    where
        V: Clone + Send + Sync + 'static,
        F: Fn(&str, Content, &str) -> Result<V> + Send + Sync + 'static,
    {
        CompiledCache {
            inner: Arc::new(Inner {
                source,
                category: category.to_string(),
                compute: Box::new(compute),
                entries: Arc::clone(&self.entries),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Number of stored entries across all categories
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().map_err(|_| poisoned())?.len())
    }

    /// Check if no entries are stored
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every stored entry
    pub fn clear(&self) -> Result<()> {
        self.entries.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

type Compute<V> = Box<dyn Fn(&str, Content, &str) -> Result<V> + Send + Sync>;

struct Inner<V> {
    source: Arc<dyn StorageBackend>,
    category: String,
    compute: Compute<V>,
    entries: EntryTable,
    in_flight: Mutex<HashMap<String, Future<V>>>,
}

impl<V: Clone + Send + Sync + 'static> Inner<V> {
    fn load(&self, path: &str) -> Result<V> {
        let version = self.source.stat(path)?.version;
        let key = CacheKey::new(&self.category, path);

        if let Some(value) = self.cached(&key, &version)? {
            debug!("cache hit: {}:{} @ {}", self.category, path, version);
            return Ok(value);
        }

        debug!("cache miss: {}:{} @ {}", self.category, path, version);
        let content = self.source.read_single(path)?;
        let value = (self.compute)(path, content, &version)?;

        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value.clone()),
                version,
            },
        );
        Ok(value)
    }

    fn cached(&self, key: &CacheKey, version: &str) -> Result<Option<V>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.version == version)
            .and_then(|entry| entry.value.downcast_ref::<V>())
            .cloned())
    }

    fn finish(&self, path: &str) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(path);
        }
    }
}

/// A category-scoped, versioned, single-flight cache of compiled values.
pub struct CompiledCache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for CompiledCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone + Send + Sync + 'static> CompiledCache<V> {
    /// The value compiled from the file at `path`.
    pub fn get_from_file(&self, path: &str) -> Future<V> {
        self.get(path.to_string())
    }

    /// The value compiled from the listing of the directory `path`.
    pub fn get_from_file_listing(&self, path: &str) -> Future<V> {
        self.get(to_directory(path))
    }

    /// The category this cache stores its entries under.
    pub fn category(&self) -> &str {
        &self.inner.category
    }

    /// The backend this cache compiles from.
    pub fn source(&self) -> &Arc<dyn StorageBackend> {
        &self.inner.source
    }

    fn get(&self, path: String) -> Future<V> {
        let mut in_flight = match self.inner.in_flight.lock() {
            Ok(in_flight) => in_flight,
            Err(_) => return Future::failed(poisoned()),
        };
        if let Some(pending) = in_flight.get(&path) {
            return pending.clone();
        }

        let inner = Arc::clone(&self.inner);
        let key = path.clone();
        let future = Future::new(move || {
            let outcome = inner.load(&key);
            inner.finish(&key);
            outcome
        });
        in_flight.insert(path, future.clone());
        future
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::MemoryFS;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn upper_cache(factory: &CompiledCacheFactory, fs: &Arc<MemoryFS>, category: &str) -> CompiledCache<String> {
        factory.create(fs.clone(), category, |path, content| {
            let bytes = content.into_bytes(path)?;
            Ok(String::from_utf8_lossy(&bytes).to_uppercase())
        })
    }

    fn fixture() -> Arc<MemoryFS> {
        Arc::new(MemoryFS::with_files([("a/one.txt", "one"), ("a/two.txt", "two")]).unwrap())
    }

    #[test]
    fn test_cache_key() {
        let key1 = CacheKey::new("models", "api/foo.json");
        let key2 = CacheKey::new("models", "api/foo.json");
        let key3 = CacheKey::new("content", "api/foo.json");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_concurrent_requests_share_one_read() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let cache = upper_cache(&factory, &fs, "upper");

        let futures: Vec<_> = (0..5).map(|_| cache.get_from_file("a/one.txt")).collect();
        for future in &futures {
            assert_eq!(future.get().unwrap(), "ONE");
        }
        assert_eq!(fs.read_count(), 1);
    }

    #[test]
    fn test_hit_at_unchanged_version_reads_nothing() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let cache = upper_cache(&factory, &fs, "upper");

        cache.get_from_file("a/one.txt").get().unwrap();
        fs.reset_counts();
        assert_eq!(cache.get_from_file("a/one.txt").get().unwrap(), "ONE");
        assert_eq!(fs.read_count(), 0);
        assert_eq!(fs.stat_count(), 1);
    }

    #[test]
    fn test_version_change_recompiles() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let cache = upper_cache(&factory, &fs, "upper");

        assert_eq!(cache.get_from_file("a/one.txt").get().unwrap(), "ONE");
        fs.add_file_string("a/one.txt", "uno").unwrap();
        assert_eq!(cache.get_from_file("a/one.txt").get().unwrap(), "UNO");
        assert_eq!(fs.read_count(), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let fs = Arc::new(MemoryFS::new());
        let factory = CompiledCacheFactory::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache: CompiledCache<usize> = factory.create(fs.clone(), "len", move |path, content| {
            counter.fetch_add(1, Ordering::SeqCst);
            let bytes = content.into_bytes(path)?;
            if bytes.is_empty() {
                return Err(Error::validation(path, "empty"));
            }
            Ok(bytes.len())
        });

        assert!(cache.get_from_file("x.txt").get().unwrap_err().is_not_found());

        fs.add_file_string("x.txt", "").unwrap();
        assert!(cache.get_from_file("x.txt").get().is_err());
        assert!(factory.is_empty().unwrap());

        fs.add_file_string("x.txt", "four").unwrap();
        assert_eq!(cache.get_from_file("x.txt").get().unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_categories_do_not_collide() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let upper = upper_cache(&factory, &fs, "upper");
        let length: CompiledCache<usize> =
            factory.create(fs.clone(), "length", |path, content| Ok(content.into_bytes(path)?.len()));

        assert_eq!(upper.get_from_file("a/two.txt").get().unwrap(), "TWO");
        assert_eq!(length.get_from_file("a/two.txt").get().unwrap(), 3);
        assert_eq!(factory.len().unwrap(), 2);
        assert_eq!(upper.category(), "upper");
    }

    #[test]
    fn test_listing_cache() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let count: CompiledCache<usize> = factory.create(fs.clone(), "count", |path, content| {
            content
                .as_listing()
                .map(|names| names.len())
                .ok_or_else(|| Error::validation(path, "not a directory"))
        });

        assert_eq!(count.get_from_file_listing("a").get().unwrap(), 2);
        fs.add_file_string("a/three.txt", "three").unwrap();
        assert_eq!(count.get_from_file_listing("a/").get().unwrap(), 3);
    }

    #[test]
    fn test_single_flight_across_threads() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let cache = upper_cache(&factory, &fs, "upper");

        let handles: Vec<_> = (0..4)
            .map(|_| cache.get_from_file("a/two.txt"))
            .map(|future| std::thread::spawn(move || future.get().unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "TWO");
        }
        assert_eq!(fs.read_count(), 1);
    }

    #[test]
    fn test_clear_forces_recompile() {
        let fs = fixture();
        let factory = CompiledCacheFactory::new();
        let cache = upper_cache(&factory, &fs, "upper");
        cache.get_from_file("a/one.txt").get().unwrap();
        factory.clear().unwrap();
        cache.get_from_file("a/one.txt").get().unwrap();
        assert_eq!(fs.read_count(), 2);
    }
}
