//! # compact-store — Store Collaborators
//!
//! The licensing engines never talk to a database directly. They speak to
//! three narrow collaborator traits defined here:
//!
//! - [`RecordStore`] (`store.rs`): a partitioned key-value/document store
//!   with point reads, sort-key range queries, secondary-index queries,
//!   conditional single-item writes, atomic multi-item conditional
//!   transactions, and batch reads. Consistency is chosen per call.
//! - [`EventBus`] (`events.rs`): `publish(source, detail_type, detail)`.
//!   Delivery failures are returned to the caller.
//! - [`ObjectStore`] (`objects.rs`): named JSON documents.
//!
//! [`InMemoryRecordStore`] (`memory.rs`) implements the record store with a
//! single lock over all partitions, which makes every transaction atomic and
//! isolated. It also supports one-shot fault injection so callers can test
//! their failure paths.
//!
//! ## Expressions
//!
//! Conditions, sort-key conditions and update expressions (`expression.rs`)
//! are plain data evaluated by the store, so the same transaction item
//! builders work against any backend.

pub mod batch;
pub mod error;
pub mod events;
pub mod expression;
pub mod item;
pub mod memory;
pub mod objects;
pub mod store;

pub use batch::{batch_get_all, RetryPolicy};
pub use error::{CancellationReason, StoreError};
pub use events::{EventBus, EventEnvelope, EventError, InMemoryEventBus};
pub use expression::{Condition, KeyCondition, UpdateExpression};
pub use item::{Item, RecordKey};
pub use memory::{IndexDefinition, InMemoryRecordStore};
pub use objects::{FsObjectStore, InMemoryObjectStore, ObjectStore, ObjectStoreError};
pub use store::{
    query_all, query_index_all, BatchGetOutput, Consistency, IndexQuery, Page, PageCursor, Query,
    RecordStore, TransactItem, MAX_TRANSACTION_ITEMS,
};
