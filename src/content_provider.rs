//! # Content Provider
//!
//! Serves the files of one configured provider. Requests may omit the file
//! extension: `get_content("intro")` tries `intro` plus each default
//! extension in order, and a directory request falls back to an `index`
//! file with a default extension. File content is compiled through the
//! shared [`CompiledCacheFactory`] into a [`ContentAndType`].

use std::sync::Arc;

use log::{debug, warn};

use crate::cache::{CompiledCache, CompiledCacheFactory};
use crate::config::ProviderConfig;
use crate::defaults::INDEX_NAME;
use crate::error::{Error, Result};
use crate::filesystem::{walk, StorageBackend};
use crate::future::Future;
use crate::path::{is_directory, join, split_extension, to_directory};

/// File content with its MIME type and the backend version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentAndType {
    pub content: Arc<Vec<u8>>,
    pub mime_type: String,
    pub version: String,
}

/// MIME type for a path, by extension. Unknown extensions are `text/plain`.
pub fn mime_type_for(path: &str) -> &'static str {
    let (_, extension) = split_extension(path);
    match extension.to_ascii_lowercase().as_str() {
        ".html" | ".htm" => "text/html",
        ".css" => "text/css",
        ".js" => "application/javascript",
        ".json" => "application/json",
        ".md" => "text/markdown",
        ".xml" => "application/xml",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".svg" => "image/svg+xml",
        ".ico" => "image/x-icon",
        ".pdf" => "application/pdf",
        ".zip" => "application/zip",
        _ => "text/plain",
    }
}

/// One provider's content.
#[derive(Clone)]
pub struct ContentProvider {
    config: Arc<ProviderConfig>,
    backend: Arc<dyn StorageBackend>,
    cache: CompiledCache<ContentAndType>,
}

impl ContentProvider {
    pub fn new(config: ProviderConfig, backend: Arc<dyn StorageBackend>, factory: &CompiledCacheFactory) -> Self {
        let category = format!("content:{}", config.name);
        let cache = factory.create_versioned(Arc::clone(&backend), &category, |path, content, version| {
            Ok(ContentAndType {
                content: Arc::new(content.into_bytes(path)?),
                mime_type: mime_type_for(path).to_string(),
                version: version.to_string(),
            })
        });
        Self {
            config: Arc::new(config),
            backend,
            cache,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn supports_templates(&self) -> bool {
        self.config.supports_templates
    }

    pub fn supports_zip(&self) -> bool {
        self.config.supports_zip
    }

    /// The content at `path`, applying default extensions and the
    /// directory index fallback.
    pub fn get_content(&self, path: &str) -> Future<ContentAndType> {
        let provider = self.clone();
        let path = path.trim_start_matches('/').to_string();
        Future::new(move || {
            let resolved = provider.resolve_path(&path)?;
            provider.cache.get_from_file(&resolved).get()
        })
    }

    /// Warm the cache with every file, plus the extension-less alias of
    /// each file carrying a default extension. Individual failures are
    /// logged and skipped; the result counts the entries warmed.
    pub fn refresh(&self) -> Future<usize> {
        let provider = self.clone();
        Future::new(move || {
            let mut requests = Vec::new();
            for file in walk(provider.backend.as_ref(), "")? {
                let (stem, extension) = split_extension(&file);
                if provider.config.default_extensions.iter().any(|ext| ext == extension) {
                    requests.push(stem.to_string());
                }
                requests.push(file);
            }

            let mut warmed = 0;
            for request in requests {
                match provider.get_content(&request).get() {
                    Ok(_) => warmed += 1,
                    Err(error) => warn!("{}: failed to warm {}: {}", provider.name(), request, error),
                }
            }
            debug!("{}: warmed {} entries", provider.name(), warmed);
            Ok(warmed)
        })
    }

    fn resolve_path(&self, path: &str) -> Result<String> {
        let (_, extension) = split_extension(path);
        if !extension.is_empty() {
            return Ok(path.to_string());
        }
        if let Some(found) = self.with_default_extension(path)? {
            return Ok(found);
        }
        let directory = to_directory(path);
        if self.backend.exists(&directory)? {
            return self
                .with_default_extension(&join(&directory, INDEX_NAME))?
                .ok_or_else(|| Error::not_found(format!("{} (directory without an index)", directory)));
        }
        Ok(path.to_string())
    }

    fn with_default_extension(&self, path: &str) -> Result<Option<String>> {
        // "dir/" + ".html" would name a hidden file, not a page.
        if is_directory(path) {
            return Ok(None);
        }
        for extension in &self.config.default_extensions {
            let candidate = format!("{}{}", path, extension);
            if self.backend.exists(&candidate)? {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}
