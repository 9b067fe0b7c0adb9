//! Rollback errors.
//!
//! Per-provider failures never surface here: they become entries in the
//! results document. These variants abort an invocation.

use thiserror::Error;

use compact_store::{ObjectStoreError, StoreError};

use crate::config::ConfigError;

/// Failures that stop a rollback invocation.
#[derive(Error, Debug)]
pub enum RollbackError {
    /// Scanning the license-jurisdiction index failed.
    #[error("provider scan failed: {0}")]
    Scan(#[source] StoreError),

    /// Reading or writing the results document failed.
    #[error("results document {key}: {source}")]
    Results {
        key: String,
        #[source]
        source: ObjectStoreError,
    },

    /// The stored results document does not have the expected shape.
    #[error("results document {key} is malformed: {source}")]
    MalformedResults {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
