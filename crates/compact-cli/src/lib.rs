//! # compact-cli — Command Handlers
//!
//! Each subcommand lives in its own module with a clap `Args` struct and a
//! `run_*` handler returning the process exit code. The binary in
//! `main.rs` only parses, sets up logging and dispatches.
//!
//! The record store is an [`compact_store::InMemoryRecordStore`] loaded
//! from a JSON snapshot file; see [`snapshot`].

pub mod inspect;
pub mod rollback;
pub mod snapshot;
