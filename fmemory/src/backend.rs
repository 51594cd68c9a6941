//! Key-value store trait, backend selection, and the in-memory backend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fcommon::BoxFuture;

use crate::backends::sqlite::default_sqlite_path;
use crate::error::MemoryError;

pub use crate::backends::filesystem::FilesystemKeyValueStore;
pub use crate::backends::sqlite::SqliteKeyValueStore;

/// Durable string blobs addressed by key. Values are opaque to the store.
pub trait KeyValueStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>>;

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>>;

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), MemoryError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendConfig {
    Sqlite { path: PathBuf },
    Filesystem { root: PathBuf },
    InMemory,
}

impl Default for StorageBackendConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

impl StorageBackendConfig {
    /// Parses `memory`, `fs:<dir>`, or `sqlite:<path>`.
    pub fn parse(value: &str) -> Result<Self, MemoryError> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("memory") {
            return Ok(Self::InMemory);
        }
        if let Some(root) = value.strip_prefix("fs:").filter(|root| !root.is_empty()) {
            return Ok(Self::Filesystem { root: root.into() });
        }
        if let Some(path) = value.strip_prefix("sqlite:").filter(|path| !path.is_empty()) {
            return Ok(Self::Sqlite { path: path.into() });
        }

        Err(MemoryError::invalid_request(format!(
            "unknown storage backend '{value}'; expected memory, fs:<dir>, or sqlite:<path>"
        )))
    }
}

pub fn create_key_value_store(
    config: StorageBackendConfig,
) -> Result<Arc<dyn KeyValueStore>, MemoryError> {
    match config {
        StorageBackendConfig::Sqlite { path } => Ok(Arc::new(SqliteKeyValueStore::new(path)?)),
        StorageBackendConfig::Filesystem { root } => {
            Ok(Arc::new(FilesystemKeyValueStore::new(root)?))
        }
        StorageBackendConfig::InMemory => Ok(Arc::new(InMemoryKeyValueStore::new())),
    }
}

pub fn create_default_key_value_store() -> Result<Arc<dyn KeyValueStore>, MemoryError> {
    create_key_value_store(StorageBackendConfig::default())
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, MemoryError>> {
        Box::pin(async move {
            let values = self
                .values
                .lock()
                .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

            Ok(values.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            let mut values = self
                .values
                .lock()
                .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

            values.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(async move {
            let mut values = self
                .values
                .lock()
                .map_err(|_| MemoryError::storage("memory backend lock poisoned"))?;

            values.remove(key);
            Ok(())
        })
    }
}
