//! # In-Memory Record Store
//!
//! A [`RecordStore`] over nested `BTreeMap`s behind one
//! `parking_lot::RwLock`. Every write, including multi-item transactions,
//! runs under the single write lock, so transactions are atomic and
//! isolated by construction and every read is strongly consistent
//! regardless of the requested [`Consistency`].
//!
//! Secondary indexes are registered up front and evaluated at query time
//! by scanning items that carry the index partition attribute.
//!
//! Fault injection (`fail_next_transaction`, `fail_transactions_for`,
//! `leave_unprocessed`) lets callers exercise their store-failure paths.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{CancellationReason, StoreError};
use crate::expression::{Condition, UpdateExpression};
use crate::item::{Item, RecordKey};
use crate::store::{
    BatchGetOutput, Consistency, IndexQuery, Page, PageCursor, Query, RecordStore, TransactItem,
    MAX_TRANSACTION_ITEMS,
};

/// Definition of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name used by [`IndexQuery::index_name`].
    pub name: String,
    /// Item attribute that holds the index partition value.
    pub partition_attribute: String,
    /// Item attribute that orders items within an index partition.
    pub sort_attribute: String,
}

impl IndexDefinition {
    /// Define an index.
    pub fn new(name: &str, partition_attribute: &str, sort_attribute: &str) -> Self {
        Self {
            name: name.to_string(),
            partition_attribute: partition_attribute.to_string(),
            sort_attribute: sort_attribute.to_string(),
        }
    }
}

type Partitions = BTreeMap<String, BTreeMap<String, Item>>;

#[derive(Debug, Default)]
struct Faults {
    next_transaction: Option<String>,
    partition: Option<(String, String)>,
    unprocessed_rounds: u32,
}

/// Thread-safe, cloneable in-memory record store.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    data: Arc<RwLock<Partitions>>,
    indexes: Arc<Vec<IndexDefinition>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemoryRecordStore {
    /// An empty store without secondary indexes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secondary index. Call before sharing the store.
    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        let mut indexes = self.indexes.as_ref().clone();
        indexes.push(index);
        self.indexes = Arc::new(indexes);
        self
    }

    /// Seed the store with items, replacing any existing item with the
    /// same key.
    pub fn seed(&self, items: impl IntoIterator<Item = Item>) -> Result<(), StoreError> {
        let mut data = self.data.write();
        for item in items {
            let key = item.key()?;
            data.entry(key.pk).or_default().insert(key.sk, item);
        }
        Ok(())
    }

    /// Every item, ordered by partition then sort key.
    pub fn snapshot(&self) -> Vec<Item> {
        self.data
            .read()
            .values()
            .flat_map(|partition| partition.values().cloned())
            .collect()
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.data.read().values().map(BTreeMap::len).sum()
    }

    /// True if the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a JSON array of items written by [`save_json_file`](Self::save_json_file).
    pub fn load_json_file(&self, path: &Path) -> Result<usize, StoreError> {
        let raw = std::fs::read(path)?;
        let items: Vec<Item> = serde_json::from_slice(&raw)?;
        let count = items.len();
        self.seed(items)?;
        tracing::debug!(path = %path.display(), count, "loaded record store snapshot");
        Ok(count)
    }

    /// Write every item as a pretty-printed JSON array.
    pub fn save_json_file(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(&self.snapshot())?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Make the next transaction fail with a transient error carrying
    /// `message`. Nothing from that transaction is written.
    pub fn fail_next_transaction(&self, message: &str) {
        self.faults.lock().next_transaction = Some(message.to_string());
    }

    /// Make every transaction touching partition `pk` fail with a
    /// transient error until cleared.
    pub fn fail_transactions_for(&self, pk: &str, message: &str) {
        self.faults.lock().partition = Some((pk.to_string(), message.to_string()));
    }

    /// Clear all injected faults.
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    /// Leave half of the requested keys unprocessed for the next `rounds`
    /// batch-get calls.
    pub fn leave_unprocessed(&self, rounds: u32) {
        self.faults.lock().unprocessed_rounds = rounds;
    }

    fn injected_transaction_fault(&self, keys: &[RecordKey]) -> Option<String> {
        let mut faults = self.faults.lock();
        if let Some(message) = faults.next_transaction.take() {
            return Some(message);
        }
        match &faults.partition {
            Some((pk, message)) if keys.iter().any(|k| &k.pk == pk) => Some(message.clone()),
            _ => None,
        }
    }

    fn index(&self, name: &str) -> Result<&IndexDefinition, StoreError> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| StoreError::InvalidRequest(format!("unknown index {name:?}")))
    }
}

fn current<'a>(data: &'a Partitions, key: &RecordKey) -> Option<&'a Item> {
    data.get(&key.pk).and_then(|p| p.get(&key.sk))
}

fn apply_write(data: &mut Partitions, write: TransactItem) -> Result<(), StoreError> {
    match write {
        TransactItem::Put { item, .. } => {
            let key = item.key()?;
            data.entry(key.pk).or_default().insert(key.sk, item);
        }
        TransactItem::Update { key, update, .. } => {
            apply_update(data, &key, &update);
        }
        TransactItem::Delete { key, .. } => {
            if let Some(partition) = data.get_mut(&key.pk) {
                partition.remove(&key.sk);
                if partition.is_empty() {
                    data.remove(&key.pk);
                }
            }
        }
        TransactItem::ConditionCheck { .. } => {}
    }
    Ok(())
}

fn apply_update(data: &mut Partitions, key: &RecordKey, update: &UpdateExpression) -> Item {
    let entry = data
        .entry(key.pk.clone())
        .or_default()
        .entry(key.sk.clone())
        .or_insert_with(|| {
            let mut fresh = Item::new();
            fresh.set_key(key);
            fresh
        });
    update.apply(entry);
    entry.clone()
}

fn paginate(mut matched: Vec<(PageCursor, Item)>, limit: Option<usize>) -> Page {
    match limit {
        Some(limit) if matched.len() > limit => {
            matched.truncate(limit);
            let last_evaluated_key = matched.last().map(|(cursor, _)| cursor.clone());
            Page {
                items: matched.into_iter().map(|(_, item)| item).collect(),
                last_evaluated_key,
            }
        }
        _ => Page {
            items: matched.into_iter().map(|(_, item)| item).collect(),
            last_evaluated_key: None,
        },
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_item(
        &self,
        key: &RecordKey,
        _consistency: Consistency,
    ) -> Result<Option<Item>, StoreError> {
        Ok(current(&self.data.read(), key).cloned())
    }

    fn query(&self, query: &Query, _consistency: Consistency) -> Result<Page, StoreError> {
        let data = self.data.read();
        let Some(partition) = data.get(&query.partition_key) else {
            return Ok(Page::default());
        };
        let start_after = query.exclusive_start.as_ref().map(|c| c.key.sk.as_str());
        let matched: Vec<(PageCursor, Item)> = partition
            .iter()
            .filter(|(sk, _)| start_after.map_or(true, |after| sk.as_str() > after))
            .filter(|(sk, _)| query.sort_key.as_ref().map_or(true, |c| c.matches(sk)))
            .map(|(sk, item)| {
                let cursor = PageCursor {
                    index_sort: None,
                    key: RecordKey::new(query.partition_key.clone(), sk.clone()),
                };
                (cursor, item.clone())
            })
            .collect();
        Ok(paginate(matched, query.limit))
    }

    fn query_index(&self, query: &IndexQuery) -> Result<Page, StoreError> {
        let index = self.index(&query.index_name)?;
        let data = self.data.read();
        let mut matched: Vec<(PageCursor, Item)> = Vec::new();
        for (pk, partition) in data.iter() {
            for (sk, item) in partition {
                if item.get_str(&index.partition_attribute) != Some(query.partition_value.as_str()) {
                    continue;
                }
                let Some(sort_value) = item.get_str(&index.sort_attribute) else {
                    continue;
                };
                let cursor = PageCursor {
                    index_sort: Some(sort_value.to_string()),
                    key: RecordKey::new(pk.clone(), sk.clone()),
                };
                if query.exclusive_start.as_ref().is_some_and(|start| &cursor <= start) {
                    continue;
                }
                matched.push((cursor, item.clone()));
            }
        }
        matched.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(paginate(matched, query.limit))
    }

    fn put_item(&self, item: Item, condition: Option<&Condition>) -> Result<(), StoreError> {
        let key = item.key()?;
        let mut data = self.data.write();
        if let Some(condition) = condition {
            if !condition.evaluate(current(&data, &key)) {
                return Err(StoreError::ConditionalCheckFailed { key });
            }
        }
        data.entry(key.pk).or_default().insert(key.sk, item);
        Ok(())
    }

    fn update_item(
        &self,
        key: &RecordKey,
        update: &UpdateExpression,
        condition: Option<&Condition>,
    ) -> Result<Item, StoreError> {
        let mut data = self.data.write();
        if let Some(condition) = condition {
            if !condition.evaluate(current(&data, key)) {
                return Err(StoreError::ConditionalCheckFailed { key: key.clone() });
            }
        }
        Ok(apply_update(&mut data, key, update))
    }

    fn delete_item(&self, key: &RecordKey, condition: Option<&Condition>) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if let Some(condition) = condition {
            if !condition.evaluate(current(&data, key)) {
                return Err(StoreError::ConditionalCheckFailed { key: key.clone() });
            }
        }
        apply_write(&mut data, TransactItem::delete(key.clone()))
    }

    fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError> {
        if items.is_empty() {
            return Err(StoreError::InvalidRequest(
                "transaction must contain at least one item".to_string(),
            ));
        }
        if items.len() > MAX_TRANSACTION_ITEMS {
            return Err(StoreError::InvalidRequest(format!(
                "transaction has {} items, limit is {MAX_TRANSACTION_ITEMS}",
                items.len()
            )));
        }
        let keys = items
            .iter()
            .map(TransactItem::key)
            .collect::<Result<Vec<_>, _>>()?;
        let mut seen = std::collections::BTreeSet::new();
        for key in &keys {
            if !seen.insert(key) {
                return Err(StoreError::InvalidRequest(format!(
                    "transaction touches {key} more than once"
                )));
            }
        }

        let mut data = self.data.write();
        if let Some(message) = self.injected_transaction_fault(&keys) {
            tracing::debug!(%message, "injected transaction failure");
            return Err(StoreError::Transient(message));
        }

        let reasons: Vec<CancellationReason> = items
            .iter()
            .zip(&keys)
            .enumerate()
            .filter(|(_, (item, key))| {
                item.condition()
                    .is_some_and(|c| !c.evaluate(current(&data, key)))
            })
            .map(|(index, (_, key))| CancellationReason {
                index,
                key: key.clone(),
                code: CancellationReason::CONDITIONAL_CHECK_FAILED.to_string(),
            })
            .collect();
        if !reasons.is_empty() {
            return Err(StoreError::TransactionCanceled { reasons });
        }

        for item in items {
            apply_write(&mut data, item)?;
        }
        Ok(())
    }

    fn batch_get(
        &self,
        keys: &[RecordKey],
        _consistency: Consistency,
    ) -> Result<BatchGetOutput, StoreError> {
        let split = {
            let mut faults = self.faults.lock();
            if faults.unprocessed_rounds > 0 && keys.len() > 1 {
                faults.unprocessed_rounds -= 1;
                keys.len() / 2
            } else {
                keys.len()
            }
        };
        let data = self.data.read();
        let (served, deferred) = keys.split_at(split);
        Ok(BatchGetOutput {
            items: served
                .iter()
                .filter_map(|key| current(&data, key).cloned())
                .collect(),
            unprocessed: deferred.to_vec(),
        })
    }
}
