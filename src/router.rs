//! # Content Router
//!
//! Maps request paths to [`ContentProvider`]s using the provider document.
//!
//! The document is read through the compiled cache, so an edit to it is
//! picked up on the next request. Providers are built lazily and memoized,
//! both by name and by the serve-from prefix a request matched; both memos
//! are dropped whenever a new version of the document is loaded.
//!
//! Misconfigured or unbuildable providers never fail a request: they are
//! logged and resolve to `None`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error};

use crate::backends::{BucketProvider, ChrootFS};
use crate::cache::{CompiledCache, CompiledCacheFactory};
use crate::config::{BackendSpec, ProviderConfig, ProviderDocument};
use crate::content_provider::ContentProvider;
use crate::error::{Error, Result};
use crate::filesystem::StorageBackend;
use crate::future::{all, Future};

/// Result of routing a request path.
#[derive(Clone)]
pub struct RouteMatch {
    /// The provider serving the path, if one matched and could be built.
    pub provider: Option<ContentProvider>,
    /// The `serveFrom` prefix that matched, or `""`.
    pub prefix: String,
    /// The rest of the path, relative to the provider.
    pub remainder: String,
}

#[derive(Default)]
struct Memo {
    document: Option<Arc<ProviderDocument>>,
    by_name: HashMap<String, Option<ContentProvider>>,
    by_prefix: HashMap<String, Option<ContentProvider>>,
}

/// Registry of the providers named in the provider document.
pub struct ContentProviders {
    host: Arc<dyn StorageBackend>,
    buckets: Arc<dyn BucketProvider>,
    factory: CompiledCacheFactory,
    document_path: String,
    document: CompiledCache<Arc<ProviderDocument>>,
    memo: Mutex<Memo>,
}

impl ContentProviders {
    /// Read the provider document at `document_path` on `host`. Chromium
    /// providers are chroots of `host`; object-store providers open their
    /// bucket through `buckets`.
    pub fn new(
        host: Arc<dyn StorageBackend>,
        buckets: Arc<dyn BucketProvider>,
        factory: CompiledCacheFactory,
        document_path: &str,
    ) -> Self {
        let document = factory.create(Arc::clone(&host), "content-providers", |path, content| {
            let bytes = content.into_bytes(path)?;
            let text = String::from_utf8(bytes).map_err(|e| Error::validation(path, e.to_string()))?;
            Ok(Arc::new(ProviderDocument::parse(&text)?))
        });
        Self {
            host,
            buckets,
            factory,
            document_path: document_path.to_string(),
            document,
            memo: Mutex::new(Memo::default()),
        }
    }

    /// The current provider document.
    pub fn document(&self) -> Result<Arc<ProviderDocument>> {
        self.document.get_from_file(&self.document_path).get()
    }

    /// The provider called `name`, or `None` (logged) when it is absent,
    /// misconfigured or cannot be built.
    pub fn get_by_name(&self, name: &str) -> Option<ContentProvider> {
        self.provider_named(name, true)
    }

    /// Route `path` to the provider whose `serveFrom` is its longest
    /// segment-aligned prefix.
    ///
    /// When nothing matches, or the matching provider cannot be built, the
    /// result is `(None, "", path)`. A broken provider does not hand its
    /// prefix over to a shorter one.
    pub fn get_by_serve_from(&self, path: &str) -> RouteMatch {
        let path = path.trim_start_matches('/');
        let unmatched = || RouteMatch {
            provider: None,
            prefix: String::new(),
            remainder: path.to_string(),
        };

        let document = match self.load_document() {
            Some(document) => document,
            None => return unmatched(),
        };

        let Some((prefix, remainder)) = longest_prefix(path, |prefix| document.name_serving(prefix).is_some())
        else {
            return unmatched();
        };

        let provider = self.memoized(|memo| memo.by_prefix.get(prefix).cloned()).unwrap_or_else(|| {
            let provider = document
                .name_serving(prefix)
                .and_then(|name| self.provider_named(name, true));
            self.remember(|memo| {
                memo.by_prefix.insert(prefix.to_string(), provider.clone());
            });
            provider
        });

        match provider {
            Some(provider) => RouteMatch {
                provider: Some(provider),
                prefix: prefix.to_string(),
                remainder: remainder.to_string(),
            },
            None => unmatched(),
        }
    }

    /// Build and refresh every provider in the document.
    ///
    /// A provider that fails to build or refresh is logged (unless
    /// `ignore_missing` is set) and does not fail the aggregate. Resolves to
    /// the names of the providers whose refresh completed.
    pub fn refresh(&self, ignore_missing: bool) -> Future<Vec<String>> {
        let document = match self.document() {
            Ok(document) => document,
            Err(error) => return Future::failed(error),
        };

        let refreshes: Vec<Future<Option<String>>> = document
            .names()
            .map(|name| match self.provider_named(name, !ignore_missing) {
                Some(provider) => {
                    let name = name.to_string();
                    let failed_name = name.clone();
                    provider.refresh().then_or_else(
                        move |_| Ok(Some(name)),
                        move |e| {
                            if !ignore_missing {
                                error!("Error refreshing content provider \"{}\": {}", failed_name, e);
                            }
                            Ok(None)
                        },
                    )
                }
                None => Future::ready(None),
            })
            .collect();

        all(refreshes).then(|names| Ok(names.into_iter().flatten().collect()))
    }

    fn provider_named(&self, name: &str, log_errors: bool) -> Option<ContentProvider> {
        let document = self.load_document()?;
        if let Some(provider) = self.memoized(|memo| memo.by_name.get(name).cloned()) {
            return provider;
        }

        let built = match document.get(name) {
            None => Err(Error::configuration(name, "no such content provider")),
            Some(Err(e)) => Err(e.clone()),
            Some(Ok(config)) => self.build(config),
        };
        let provider = match built {
            Ok(provider) => Some(provider),
            Err(e) => {
                if log_errors {
                    error!("{}", e);
                }
                None
            }
        };
        self.remember(|memo| {
            memo.by_name.insert(name.to_string(), provider.clone());
        });
        provider
    }

    fn build(&self, config: &ProviderConfig) -> Result<ContentProvider> {
        let backend: Arc<dyn StorageBackend> = match &config.backend {
            BackendSpec::Chroot { dir } => Arc::new(ChrootFS::new(Arc::clone(&self.host), dir)),
            BackendSpec::ObjectStore { bucket, dir } => {
                let bucket_backend = self.buckets.open(bucket)?;
                match dir {
                    Some(dir) => Arc::new(ChrootFS::new(bucket_backend, dir)),
                    None => bucket_backend,
                }
            }
        };
        debug!("built content provider {}", config.name);
        Ok(ContentProvider::new(config.clone(), backend, &self.factory))
    }

    /// The document, resetting the memos if it changed since last seen.
    fn load_document(&self) -> Option<Arc<ProviderDocument>> {
        let document = match self.document() {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to load {}: {}", self.document_path, e);
                return None;
            }
        };
        self.remember(|memo| {
            let unchanged = memo
                .document
                .as_ref()
                .is_some_and(|seen| Arc::ptr_eq(seen, &document));
            if !unchanged {
                memo.by_name.clear();
                memo.by_prefix.clear();
                memo.document = Some(Arc::clone(&document));
            }
        });
        Some(document)
    }

    fn memoized<T>(&self, read: impl FnOnce(&Memo) -> Option<T>) -> Option<T> {
        self.memo.lock().ok().and_then(|memo| read(&memo))
    }

    fn remember(&self, write: impl FnOnce(&mut Memo)) {
        if let Ok(mut memo) = self.memo.lock() {
            write(&mut memo);
        }
    }
}

/// Longest segment-aligned prefix of `path` accepted by `is_mount`, with the
/// remainder after it. The empty prefix is tried last.
///
/// ```
/// use docserve::router::longest_prefix;
/// let mounts = ["", "apples-dir", "tomatoes-dir/are/a"];
/// let is_mount = |prefix: &str| mounts.contains(&prefix);
/// assert_eq!(longest_prefix("tomatoes-dir/are", is_mount), Some(("", "tomatoes-dir/are")));
/// assert_eq!(longest_prefix("tomatoes-dir/are/a/fruit", is_mount), Some(("tomatoes-dir/are/a", "fruit")));
/// assert_eq!(longest_prefix("apples-dirt", is_mount), Some(("", "apples-dirt")));
/// ```
pub fn longest_prefix(path: &str, is_mount: impl Fn(&str) -> bool) -> Option<(&str, &str)> {
    let mut boundaries: Vec<usize> = path.match_indices('/').map(|(index, _)| index).collect();
    boundaries.push(path.len());
    boundaries
        .into_iter()
        .rev()
        .map(|end| (&path[..end], path[end..].trim_start_matches('/')))
        .chain(std::iter::once(("", path)))
        .find(|(prefix, _)| is_mount(prefix))
}
