//! # compact-core — Foundational Types for the Compact Licensing Core
//!
//! Leaf crate of the workspace. Every other `compact-*` crate depends on it;
//! it depends on nothing internal.
//!
//! ## Contents
//!
//! - **Identifiers** (`identity.rs`, `jurisdiction.rs`): `ProviderId`,
//!   `AdverseActionId`, `InvestigationId`, `CompactCode`, `Jurisdiction`,
//!   `LicenseTypeAbbr`. Validated newtypes; no bare strings cross crate
//!   boundaries where an identifier is meant.
//!
//! - **Time** (`temporal.rs`): UTC-only `Timestamp` with millisecond
//!   precision whose string form sorts chronologically, plus the `Clock`
//!   trait so engines never read the wall clock directly.
//!
//! - **Content hashing** (`canonical.rs`, `digest.rs`): update-history sort
//!   keys embed a SHA-256 over canonical JSON bytes. `sha256_digest()` only
//!   accepts `CanonicalBytes`.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod jurisdiction;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{AdverseActionId, InvestigationId, ProviderId};
pub use jurisdiction::{CompactCode, Jurisdiction, LicenseTypeAbbr};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
