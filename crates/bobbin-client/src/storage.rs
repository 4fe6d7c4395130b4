//! Key-value storage capability provided by the host.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-specific failure.
    #[error("storage backend failed")]
    Backend {
        /// Key involved in the failed operation.
        key: String,
        /// Backend detail message.
        detail: String,
    },
    /// Reading or writing the backing file failed.
    #[error("storage io failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved in the operation.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Persisted payload could not be parsed or serialized.
    #[error("storage payload invalid")]
    Payload {
        /// File holding the payload.
        path: PathBuf,
        /// Source serde error.
        source: serde_json::Error,
    },
}

/// Convenience alias for storage results.
pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous key-value storage, mirroring the host's storage primitives.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be written.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Process-local store, used by tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` currently holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_store_set_get_remove() -> StorageResult<()> {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("token", json!("abc"))?;
        assert_eq!(store.get("token")?, Some(json!("abc")));
        assert!(store.contains("token"));
        store.remove("token")?;
        store.remove("token")?;
        assert_eq!(store.get("token")?, None);
        assert_eq!(store.len(), 0);
        Ok(())
    }
}
