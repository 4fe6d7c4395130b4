//! JSON-file implementation of the session key-value store.
//!
//! The whole map is rewritten on each change through a sibling temporary
//! file and a rename, so a crash never leaves a half-written state file. An
//! unreadable file is replaced on the next write.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use bobbin_client::{KeyValueStore, StorageError, StorageResult};
use serde_json::{Map, Value};
use tracing::warn;

/// Default location of the state file, relative to the working directory.
pub(crate) const DEFAULT_STATE_FILE: &str = ".bobbin/session.json";

/// Key-value store persisted as one JSON object on disk.
#[derive(Debug)]
pub(crate) struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> StorageResult<Map<String, Value>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&text).map_err(|source| StorageError::Payload {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, entries: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                operation: "create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(entries).map_err(|source| {
            StorageError::Payload {
                path: self.path.clone(),
                source,
            }
        })?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, text).map_err(|source| StorageError::Io {
            operation: "write",
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StorageError::Io {
            operation: "rename",
            path: self.path.clone(),
            source,
        })
    }

    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>) -> bool) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, recovered) = match self.load() {
            Ok(entries) => (entries, false),
            Err(StorageError::Payload { .. }) => {
                warn!(path = %self.path.display(), "state file unreadable; starting fresh");
                (Map::new(), true)
            }
            Err(err) => return Err(err),
        };
        if apply(&mut entries) || recovered {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn missing_file_reads_as_empty() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.json");
        let store = FileStore::new(&path);
        assert_eq!(store.get("token")?, None);
        store.remove("token")?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn values_survive_a_new_handle() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.json");
        let store = FileStore::new(&path);
        store.set("token", json!("ZW5jb2RlZA=="))?;
        store.set("tokenExpireTime", json!(1_700_000_000_000_i64))?;

        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get("token")?, Some(json!("ZW5jb2RlZA==")));
        assert_eq!(
            reopened.get("tokenExpireTime")?,
            Some(json!(1_700_000_000_000_i64))
        );

        reopened.remove("token")?;
        assert_eq!(store.get("token")?, None);
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_a_payload_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json")?;
        let store = FileStore::new(&path);
        assert!(matches!(
            store.get("token"),
            Err(StorageError::Payload { .. })
        ));

        store.remove("token")?;
        assert_eq!(store.get("token")?, None);
        assert_eq!(fs::read_to_string(&path)?.trim(), "{}");
        Ok(())
    }
}
