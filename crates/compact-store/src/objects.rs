//! # Object Store
//!
//! Named JSON documents. The rollback engine accumulates its per-execution
//! results document here. Keys are `/`-separated relative paths such as
//! `{executionName}/rollback-results.json`.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

/// Errors from object store operations.
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    /// Filesystem failure.
    #[error("io error on {key}: {source}")]
    Io {
        /// Object key.
        key: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Stored bytes are not valid JSON, or the value failed to serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key is empty, absolute, or escapes the store root.
    #[error("invalid object key {0:?}")]
    InvalidKey(String),
}

/// Get/put of named JSON documents.
pub trait ObjectStore: Send + Sync {
    /// Read a document, `None` if absent.
    fn get_json(&self, key: &str) -> Result<Option<Value>, ObjectStoreError>;

    /// Create or overwrite a document.
    fn put_json(&self, key: &str, value: &Value) -> Result<(), ObjectStoreError>;
}

fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let path = Path::new(key);
    let well_formed = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if well_formed {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidKey(key.to_string()))
    }
}

/// In-memory object store. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ObjectStoreError> {
        validate_key(key)?;
        match self.objects.read().get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json(&self, key: &str, value: &Value) -> Result<(), ObjectStoreError> {
        validate_key(key)?;
        let bytes = serde_json::to_vec(value)?;
        self.objects.write().insert(key.to_string(), bytes);
        Ok(())
    }
}

/// Object store backed by a directory; each key is a file under `root`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a key.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn get_json(&self, key: &str) -> Result<Option<Value>, ObjectStoreError> {
        let path = self.object_path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ObjectStoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn put_json(&self, key: &str, value: &Value) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        let io_err = |source| ObjectStoreError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let bytes = serde_json::to_vec_pretty(value)?;
        std::fs::write(&path, bytes).map_err(io_err)
    }
}
