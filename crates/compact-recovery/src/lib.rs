//! # compact-recovery — Upload Rollback
//!
//! Reconstructs pre-window state for providers affected by a faulty
//! license upload, using nothing but the update history the engines and
//! the ingestion writer leave behind. Providers whose records were also
//! changed legitimately in or after the window are skipped for manual
//! review rather than guessed at.
//!
//! Entry point: [`RollbackEngine::run`], called repeatedly by a scheduler
//! until it reports `COMPLETE` or `FAILED`.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod request;

pub use classify::{classify, Classification, ProviderRollback, RecordChange};
pub use config::{ConfigError, RollbackConfig};
pub use engine::RollbackEngine;
pub use error::RollbackError;
pub use report::{
    FailedProvider, IneligibleUpdate, LicenseRevert, RevertAction, RevertedProvider,
    RollbackResults, SkippedProvider,
};
pub use request::{RollbackInput, RollbackOutput, RollbackRequest, RollbackStatus};
