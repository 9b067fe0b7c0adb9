//! # Record Store Contract
//!
//! The operations the licensing engines need from a partitioned
//! document store. Semantics follow the usual wide-column conventions:
//!
//! - Items within a partition are ordered by sort key.
//! - Queries are paginated; `Page::last_evaluated_key` is the cursor for
//!   the next page and is `None` on the last page.
//! - Secondary indexes are eventually consistent and serve reads only.
//! - A transaction either applies every item or none. If any condition
//!   fails the store returns [`StoreError::TransactionCanceled`] naming
//!   the offending items.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::expression::{Condition, KeyCondition, UpdateExpression};
use crate::item::{Item, RecordKey};

/// Largest number of items one transaction may carry.
pub const MAX_TRANSACTION_ITEMS: usize = 100;

/// Read consistency for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consistency {
    /// Reflects every write acknowledged before the read.
    Strong,
    /// May lag recent writes. Acceptable for high-volume listing only.
    Eventual,
}

/// Cursor for resuming a paginated query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageCursor {
    /// Index sort value of the last item returned (index queries only).
    pub index_sort: Option<String>,
    /// Primary key of the last item returned.
    pub key: RecordKey,
}

/// A range query within one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Partition to read.
    pub partition_key: String,
    /// Optional condition on the sort key.
    pub sort_key: Option<KeyCondition>,
    /// Maximum number of items per page.
    pub limit: Option<usize>,
    /// Resume after this cursor.
    pub exclusive_start: Option<PageCursor>,
}

impl Query {
    /// Every item of a partition.
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
            limit: None,
            exclusive_start: None,
        }
    }

    /// Restrict by sort key.
    pub fn with_sort_key(mut self, condition: KeyCondition) -> Self {
        self.sort_key = Some(condition);
        self
    }

    /// Cap the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A query against a secondary index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// Registered index name.
    pub index_name: String,
    /// Value of the index partition attribute.
    pub partition_value: String,
    /// Maximum number of items per page.
    pub limit: Option<usize>,
    /// Resume after this cursor.
    pub exclusive_start: Option<PageCursor>,
}

impl IndexQuery {
    /// Every item under one index partition value.
    pub fn new(index_name: impl Into<String>, partition_value: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            partition_value: partition_value.into(),
            limit: None,
            exclusive_start: None,
        }
    }

    /// Cap the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Items in key order.
    pub items: Vec<Item>,
    /// Cursor for the next page, `None` when exhausted.
    pub last_evaluated_key: Option<PageCursor>,
}

/// One write inside an atomic transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactItem {
    /// Create or replace a whole item.
    Put {
        /// The full item, including key attributes.
        item: Item,
        /// Guard evaluated against the current version.
        condition: Option<Condition>,
    },
    /// Modify attributes of an item (creating it if absent and unguarded).
    Update {
        /// Target key.
        key: RecordKey,
        /// Clauses to apply.
        update: UpdateExpression,
        /// Guard evaluated against the current version.
        condition: Option<Condition>,
    },
    /// Remove an item.
    Delete {
        /// Target key.
        key: RecordKey,
        /// Guard evaluated against the current version.
        condition: Option<Condition>,
    },
    /// Assert a condition without writing.
    ConditionCheck {
        /// Target key.
        key: RecordKey,
        /// The assertion.
        condition: Condition,
    },
}

impl TransactItem {
    /// Unconditional put.
    pub fn put(item: Item) -> Self {
        Self::Put {
            item,
            condition: None,
        }
    }

    /// Put that fails if the item already exists.
    pub fn put_new(item: Item) -> Self {
        Self::Put {
            item,
            condition: Some(Condition::item_not_exists()),
        }
    }

    /// Unconditional delete.
    pub fn delete(key: RecordKey) -> Self {
        Self::Delete {
            key,
            condition: None,
        }
    }

    /// The key this item writes or checks.
    pub fn key(&self) -> Result<RecordKey, StoreError> {
        match self {
            Self::Put { item, .. } => item.key(),
            Self::Update { key, .. } | Self::Delete { key, .. } | Self::ConditionCheck { key, .. } => {
                Ok(key.clone())
            }
        }
    }

    /// The guard, if any.
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Self::Put { condition, .. }
            | Self::Update { condition, .. }
            | Self::Delete { condition, .. } => condition.as_ref(),
            Self::ConditionCheck { condition, .. } => Some(condition),
        }
    }
}

/// Result of one batch-get round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetOutput {
    /// Items found. Missing keys are simply absent.
    pub items: Vec<Item>,
    /// Keys the store did not get to; the caller should retry them.
    pub unprocessed: Vec<RecordKey>,
}

/// A partitioned document store with conditional transactions.
///
/// Implementations must be `Send + Sync` so one store can be shared by
/// every engine behind an `Arc`.
pub trait RecordStore: Send + Sync {
    /// Point read.
    fn get_item(&self, key: &RecordKey, consistency: Consistency)
        -> Result<Option<Item>, StoreError>;

    /// Range query within one partition, ordered by sort key.
    fn query(&self, query: &Query, consistency: Consistency) -> Result<Page, StoreError>;

    /// Query a secondary index, ordered by the index sort attribute.
    /// Index reads are always eventually consistent.
    fn query_index(&self, query: &IndexQuery) -> Result<Page, StoreError>;

    /// Create or replace an item, optionally guarded.
    fn put_item(&self, item: Item, condition: Option<&Condition>) -> Result<(), StoreError>;

    /// Update an item in place, optionally guarded. Returns the new version.
    fn update_item(
        &self,
        key: &RecordKey,
        update: &UpdateExpression,
        condition: Option<&Condition>,
    ) -> Result<Item, StoreError>;

    /// Delete an item, optionally guarded. Deleting a missing item succeeds.
    fn delete_item(&self, key: &RecordKey, condition: Option<&Condition>) -> Result<(), StoreError>;

    /// Apply every item atomically or none of them.
    fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError>;

    /// Read many keys at once. The store may leave some keys unprocessed.
    fn batch_get(
        &self,
        keys: &[RecordKey],
        consistency: Consistency,
    ) -> Result<BatchGetOutput, StoreError>;
}

/// Follow pagination until the query is exhausted.
pub fn query_all(
    store: &dyn RecordStore,
    mut query: Query,
    consistency: Consistency,
) -> Result<Vec<Item>, StoreError> {
    let mut items = Vec::new();
    loop {
        let page = store.query(&query, consistency)?;
        items.extend(page.items);
        match page.last_evaluated_key {
            Some(cursor) => query.exclusive_start = Some(cursor),
            None => return Ok(items),
        }
    }
}

/// Follow index pagination until the query is exhausted.
pub fn query_index_all(store: &dyn RecordStore, mut query: IndexQuery) -> Result<Vec<Item>, StoreError> {
    let mut items = Vec::new();
    loop {
        let page = store.query_index(&query)?;
        items.extend(page.items);
        match page.last_evaluated_key {
            Some(cursor) => query.exclusive_start = Some(cursor),
            None => return Ok(items),
        }
    }
}
