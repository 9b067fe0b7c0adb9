//! # compact-state — Record Model and State Engines
//!
//! Keeps one provider's licensing facts consistent while independent
//! processes mutate them. There is no lock manager: every multi-record
//! transition is a single conditional transaction against the record
//! store, computed from a strongly consistent read of the provider.
//!
//! ## Layers
//!
//! - **Model** (`model/`): typed records, sort-key encoding, and the
//!   tiered append-only update history.
//!
//! - **Aggregate** (`aggregate.rs`): all records of one provider read into
//!   memory, optionally with history up to a tier. Every "is anything
//!   else still encumbered / open" question is answered from it.
//!
//! - **Transactions** (`txn.rs`): builders that turn current state into
//!   the items of one transaction, each guarded on the premise it was
//!   computed from.
//!
//! - **Engines** (`encumbrance.rs`, `investigation.rs`): adverse actions
//!   and investigations against a [`RecordTarget`], resolved once at entry.
//!
//! - **Uploads** (`ingest.rs`): the license upload writes that produce
//!   upload-related history.
//!
//! ## Crate Policy
//!
//! - No `.unwrap()` outside tests.
//! - Store condition failures become `Conflict` or `NotFound`, never
//!   silent success.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod encumbrance;
pub mod error;
pub mod events;
pub mod ingest;
pub mod investigation;
pub mod model;
pub mod target;
pub mod txn;

pub use aggregate::ProviderAggregate;
pub use config::{ConfigError, EngineConfig};
pub use context::EngineContext;
pub use encumbrance::{EncumbranceEngine, EncumbranceRequest, LiftOutcome, LiftRequest};
pub use error::{EngineError, ModelError};
pub use events::EventPublisher;
pub use ingest::{IngestOutcome, LicenseIngestor, LicenseUpload};
pub use investigation::{
    CloseInvestigationRequest, CloseOutcome, EncumbranceTerms, InvestigationEngine,
    InvestigationRequest,
};
pub use model::{
    AdverseActionRecord, InvestigationRecord, LicenseRecord, PrivilegeRecord, ProviderRecord,
    RecordType, StoredRecord, UpdateRecord, UpdateSubject, UpdateTier, UpdateTierBound,
    UpdateType,
};
pub use target::{RecordTarget, StatusBearing, TargetRecord};
