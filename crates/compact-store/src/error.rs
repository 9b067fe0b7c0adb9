//! # Store Errors
//!
//! Optimistic-concurrency failures are distinguishable from transient
//! store failures: callers translate the former into domain errors
//! (`NotFound`, `Conflict`) and surface the latter unchanged.

use thiserror::Error;

use crate::item::RecordKey;

/// Why one item of a transaction caused the whole transaction to cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationReason {
    /// Position of the offending item in the submitted transaction.
    pub index: usize,
    /// Key of the offending item.
    pub key: RecordKey,
    /// Machine-readable reason, e.g. `ConditionalCheckFailed`.
    pub code: String,
}

/// Errors returned by record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A single-item write's condition evaluated to false.
    #[error("conditional check failed for {key}")]
    ConditionalCheckFailed {
        /// Key of the item whose condition failed.
        key: RecordKey,
    },

    /// A multi-item transaction was cancelled; nothing was written.
    #[error("transaction cancelled: {}", describe_reasons(.reasons))]
    TransactionCanceled {
        /// One entry per item that caused the cancellation.
        reasons: Vec<CancellationReason>,
    },

    /// The store could not serve the request right now (throttling,
    /// network, injected fault). Safe to retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Keys remained unprocessed after all batch-get retries.
    #[error("{remaining} keys remained unprocessed after {attempts} batch-get attempts")]
    Unprocessed {
        /// Number of keys never returned.
        remaining: usize,
        /// Attempts made, including the first.
        attempts: u32,
    },

    /// The request itself was malformed.
    #[error("invalid store request: {0}")]
    InvalidRequest(String),

    /// Item (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Snapshot file IO failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the failure is an optimistic-concurrency condition
    /// failure rather than an infrastructure problem.
    pub fn is_condition_failure(&self) -> bool {
        match self {
            Self::ConditionalCheckFailed { .. } => true,
            Self::TransactionCanceled { reasons } => reasons
                .iter()
                .any(|r| r.code == CancellationReason::CONDITIONAL_CHECK_FAILED),
            _ => false,
        }
    }

    /// True if the given key is among the cancellation reasons.
    pub fn condition_failed_for(&self, key: &RecordKey) -> bool {
        match self {
            Self::ConditionalCheckFailed { key: failed } => failed == key,
            Self::TransactionCanceled { reasons } => reasons.iter().any(|r| &r.key == key),
            _ => false,
        }
    }
}

impl CancellationReason {
    /// Code for a failed condition expression.
    pub const CONDITIONAL_CHECK_FAILED: &'static str = "ConditionalCheckFailed";
}

fn describe_reasons(reasons: &[CancellationReason]) -> String {
    reasons
        .iter()
        .map(|r| format!("[{}] {} ({})", r.index, r.code, r.key))
        .collect::<Vec<_>>()
        .join(", ")
}
