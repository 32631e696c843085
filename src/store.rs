//! Local key-value cache
//!
//! Plays the role of the browser's local storage: plain string values keyed
//! by name, JSON-encoded by the caller. Survives independently of the
//! document host.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;

/// Errors from the local cache
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Local string store
pub trait Store: Send + Sync {
    fn set_local(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get_local(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn set_local(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_local(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.read().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }
}

/// Store keeping one file per key under a directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base_path: PathBuf,
}

impl DirectoryStore {
    /// Open or create a store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|source| StoreError::Io {
            key: base_path.display().to_string(),
            source,
        })?;
        debug!(?base_path, "Opened directory store");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl Store for DirectoryStore {
    fn set_local(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        debug!(?path, "DirectoryStore::set_local: called");
        fs::write(&path, value).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn get_local(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        if !path.exists() {
            debug!(?path, "DirectoryStore::get_local: missing");
            return Ok(None);
        }
        fs::read_to_string(&path).map(Some).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }
}
