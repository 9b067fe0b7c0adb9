//! Error types for the record model and the state engines.

use thiserror::Error;

use compact_core::{CanonicalizationError, CoreError};
use compact_store::{EventError, StoreError};

/// Errors raised while encoding or decoding stored records.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Item conversion or key extraction failed.
    #[error("item conversion failed: {0}")]
    Store(#[from] StoreError),

    /// An identifier or timestamp inside an item was invalid.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Canonical bytes for a content hash could not be produced.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// The item's `type` attribute names a different record type.
    #[error("expected record type {expected}, found {found}")]
    UnexpectedRecordType {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type stored on the item.
        found: String,
    },
}

/// Errors surfaced by the encumbrance and investigation engines.
///
/// Callers translate these into their own failure markers; the engines
/// never swallow them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The provider, target record, adverse action or investigation is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request is malformed or conflicts with the record's lifecycle.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A concurrent writer changed the premise of the transaction.
    /// Retrying re-reads the aggregate and recomputes the delta.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store failed for reasons unrelated to conditions.
    #[error("store failure: {0}")]
    StoreTransient(#[source] StoreError),

    /// Stored state violates an invariant the engines rely on.
    #[error("internal error: {0}")]
    Internal(String),

    /// A record could not be encoded or decoded.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Publishing a follow-up event failed after the transaction committed.
    #[error("event publish failed: {0}")]
    Event(#[from] EventError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        if err.is_condition_failure() {
            Self::Conflict(err.to_string())
        } else {
            Self::StoreTransient(err)
        }
    }
}

impl EngineError {
    /// Whether retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StoreTransient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_store::{CancellationReason, RecordKey};

    #[test]
    fn test_condition_failures_become_conflicts() {
        let err = EngineError::from(StoreError::TransactionCanceled {
            reasons: vec![CancellationReason {
                index: 0,
                key: RecordKey::new("p", "s"),
                code: CancellationReason::CONDITIONAL_CHECK_FAILED.to_string(),
            }],
        });
        assert!(matches!(err, EngineError::Conflict(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_store_failures_are_transient() {
        let err = EngineError::from(StoreError::Transient("throttled".into()));
        assert!(matches!(err, EngineError::StoreTransient(_)));
        assert!(err.to_string().contains("throttled"));
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        assert!(!EngineError::NotFound("license".into()).is_retryable());
    }
}
