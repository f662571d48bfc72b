//! Key/value object store capability
//!
//! Long-lived string values (resolved links, for instance) are kept in an
//! [`ObjectStore`]. Keys are bounded by [`OBJECT_STORE_KEY_LIMIT`]; callers
//! pass keys through [`bounded_key`], which truncates oversized keys and logs
//! instead of failing.

use std::collections::HashMap;
use std::sync::Mutex;

use log::error;

use crate::defaults::OBJECT_STORE_KEY_LIMIT;
use crate::error::{Error, Result};

/// A string-to-string store.
pub trait ObjectStore: Send + Sync {
    /// The value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Truncate `key` to [`OBJECT_STORE_KEY_LIMIT`] bytes on a character
/// boundary, logging an error when truncation happens.
pub fn bounded_key(key: &str) -> String {
    if key.len() <= OBJECT_STORE_KEY_LIMIT {
        return key.to_string();
    }
    let end = char_floor(key, OBJECT_STORE_KEY_LIMIT);
    error!(
        "Object store key is {} bytes, truncating to {}: {}...",
        key.len(),
        end,
        &key[..char_floor(key, 64)]
    );
    key[..end].to_string()
}

/// The largest character boundary of `text` at or below `index`.
fn char_floor(text: &str, index: usize) -> usize {
    let mut end = index.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// In-process [`ObjectStore`].
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.lock().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> Error {
    Error::LockPoisoned {
        context: "MemoryObjectStore".to_string(),
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
