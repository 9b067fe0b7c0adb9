//! # Error Types
//!
//! Errors raised while constructing foundational values. Higher crates wrap
//! `CoreError` in their own enums via `#[from]`.

use thiserror::Error;

/// Top-level error type for `compact-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// An identifier did not satisfy its format rules.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier kind (e.g. "jurisdiction").
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A timestamp or date could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser detail.
        reason: String,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Floats have no single canonical rendering; record attributes must be
    /// strings, integers, booleans, or dates.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
