//! Key-value persistence for favourites, theme, and navigation state
//!
//! Stands in for the browser's localStorage: a flat string-to-string map,
//! written through on every mutation and rehydrated at startup.

use crate::error::StorageError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable string key-value storage
///
/// Writes are synchronous: when `set` returns, the value is persisted.
pub trait KeyValueStorage: Send + Sync {
    /// Reads the value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, persisting before returning
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the value stored under `key`
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage keeping all keys in a single JSON object
///
/// The whole map is rewritten on every `set`; the data involved is a few
/// short strings, so this stays cheap.
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStorage {
    /// Opens (or creates) storage at `path`, rehydrating existing entries.
    ///
    /// A missing file yields empty storage; a corrupt file is discarded
    /// with a warning rather than failing startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt storage file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, encoded)?;
        Ok(())
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        self.flush(&entries)
    }
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
