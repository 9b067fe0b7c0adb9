//! # Transaction Item Builders
//!
//! The engines read an aggregate, compute the intended delta, and submit
//! it as one all-or-nothing transaction whose conditions fail if the
//! premise changed in between. Each builder here takes current state and
//! returns the items for one part of that delta, or nothing when the
//! part is already in place.
//!
//! Status updates are guarded on the `dateOfUpdate` the engine read, so a
//! concurrent writer that touched the same record turns the transaction
//! into a conflict instead of a lost update.

use chrono::NaiveDate;
use serde_json::Value;

use compact_core::{AdverseActionId, Timestamp};
use compact_store::{Condition, Item, RecordKey, RecordStore, StoreError, TransactItem, UpdateExpression};

use crate::aggregate::ProviderAggregate;
use crate::error::ModelError;
use crate::model::adverse_action::EFFECTIVE_LIFT_DATE_ATTRIBUTE;
use crate::model::investigation::CLOSE_DATE_ATTRIBUTE;
use crate::model::keys::provider_key;
use crate::model::update::UpdateDraft;
use crate::model::{AdverseActionRecord, EncumberedStatus, InvestigationRecord, StoredRecord};

const DATE_OF_UPDATE: &str = "dateOfUpdate";
const ENCUMBERED_STATUS: &str = "encumberedStatus";

/// Items of one pending transaction, in submission order.
#[derive(Debug, Clone, Default)]
pub struct TransactionPlan {
    items: Vec<TransactItem>,
}

impl TransactionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: TransactItem) {
        self.items.push(item);
    }

    pub fn push_all(&mut self, items: impl IntoIterator<Item = TransactItem>) {
        self.items.extend(items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TransactItem] {
        &self.items
    }

    /// Submit the plan. An empty plan commits trivially.
    pub fn commit(self, store: &dyn RecordStore) -> Result<(), StoreError> {
        if self.items.is_empty() {
            return Ok(());
        }
        store.transact_write(self.items)
    }
}

/// Guard matching the version of `item` that was read.
pub fn version_guard(item: &Item) -> Condition {
    let version = match item.get(DATE_OF_UPDATE) {
        Some(value) => Condition::equals(DATE_OF_UPDATE, value.clone()),
        None => Condition::not_exists(DATE_OF_UPDATE),
    };
    Condition::item_exists().and(version)
}

/// History entry plus the matching guarded update of the subject record.
pub fn recorded_change(
    aggregate: &ProviderAggregate,
    subject_item: &Item,
    draft: UpdateDraft,
    now: Timestamp,
) -> Result<[TransactItem; 2], ModelError> {
    let update = draft.update_expression(now);
    let record = draft.finish(aggregate.compact(), aggregate.provider_id(), now)?;
    Ok([
        TransactItem::put_new(record.to_item()?),
        TransactItem::Update {
            key: subject_item.key()?,
            update,
            condition: Some(version_guard(subject_item)),
        },
    ])
}

/// Guarded status update without a history entry.
pub fn unrecorded_change(
    subject_item: &Item,
    update: UpdateExpression,
    now: Timestamp,
) -> Result<TransactItem, ModelError> {
    Ok(TransactItem::Update {
        key: subject_item.key()?,
        update: update.set(DATE_OF_UPDATE, now.to_iso8601()),
        condition: Some(version_guard(subject_item)),
    })
}

/// Move the provider's aggregate status to `to`, or nothing if it is
/// already there or the provider record is absent.
pub fn provider_status(
    aggregate: &ProviderAggregate,
    to: EncumberedStatus,
    now: Timestamp,
) -> Option<TransactItem> {
    let provider = aggregate.provider()?;
    if provider.encumbered_status == to {
        return None;
    }
    let key = provider_key(aggregate.compact(), aggregate.provider_id());
    let item = aggregate.item(&key.sk)?;
    Some(TransactItem::Update {
        key,
        update: UpdateExpression::new()
            .set(ENCUMBERED_STATUS, to.as_str())
            .set(DATE_OF_UPDATE, now.to_iso8601()),
        condition: Some(version_guard(item)),
    })
}

/// Re-assert `status` on a record without changing it.
///
/// Fails the transaction if the status moved since the read, and moves
/// `dateOfUpdate` forward so a concurrent writer still holding the old
/// version fails its own guard.
pub fn reaffirm_status(item: &Item, status: &str, now: Timestamp) -> Result<TransactItem, ModelError> {
    Ok(TransactItem::Update {
        key: item.key()?,
        update: UpdateExpression::new().set(DATE_OF_UPDATE, next_version(item, now).to_iso8601()),
        condition: Some(version_guard(item).and(Condition::equals(ENCUMBERED_STATUS, status))),
    })
}

/// [`reaffirm_status`] for the provider record, when it is already at `status`.
pub fn reaffirm_provider_status(
    aggregate: &ProviderAggregate,
    status: EncumberedStatus,
    now: Timestamp,
) -> Result<Option<TransactItem>, ModelError> {
    match aggregate.provider() {
        Some(provider) if provider.encumbered_status == status => {
            let key = provider_key(aggregate.compact(), aggregate.provider_id());
            aggregate
                .item(&key.sk)
                .map(|item| reaffirm_status(item, status.as_str(), now))
                .transpose()
        }
        _ => Ok(None),
    }
}

/// `now`, or one millisecond past the stored version if the clock has not
/// moved beyond it.
fn next_version(item: &Item, now: Timestamp) -> Timestamp {
    let stored = item.get_str(DATE_OF_UPDATE).and_then(|s| Timestamp::parse_lenient(s).ok());
    match stored {
        Some(stored) if stored >= now => stored
            .checked_add(chrono::Duration::milliseconds(1))
            .unwrap_or(now),
        _ => now,
    }
}

/// Create a record that must not exist yet.
pub fn create<R: StoredRecord>(record: &R) -> Result<TransactItem, ModelError> {
    Ok(TransactItem::put_new(record.to_item()?))
}

/// Set lift fields on an adverse action, at most once.
pub fn lift_adverse_action(
    record: &AdverseActionRecord,
    lift_date: NaiveDate,
    lifting_user: &str,
    now: Timestamp,
) -> TransactItem {
    TransactItem::Update {
        key: record.key(),
        update: UpdateExpression::new()
            .set(EFFECTIVE_LIFT_DATE_ATTRIBUTE, lift_date.to_string())
            .set("liftingUser", lifting_user)
            .set(DATE_OF_UPDATE, now.to_iso8601()),
        condition: Some(unlifted()),
    }
}

/// Assert another adverse action is still unlifted at commit time.
pub fn still_unlifted(record: &AdverseActionRecord) -> TransactItem {
    TransactItem::ConditionCheck {
        key: record.key(),
        condition: unlifted(),
    }
}

fn unlifted() -> Condition {
    Condition::item_exists().and(Condition::not_exists(EFFECTIVE_LIFT_DATE_ATTRIBUTE))
}

/// Set closure fields on an investigation, at most once.
pub fn close_investigation(
    record: &InvestigationRecord,
    closing_user: &str,
    close_date: Timestamp,
    resulting_encumbrance_id: Option<&AdverseActionId>,
    now: Timestamp,
) -> TransactItem {
    let mut update = UpdateExpression::new()
        .set(CLOSE_DATE_ATTRIBUTE, close_date.to_iso8601())
        .set("closingUser", closing_user)
        .set(DATE_OF_UPDATE, now.to_iso8601());
    if let Some(id) = resulting_encumbrance_id {
        update = update.set("resultingEncumbranceId", Value::String(id.to_string()));
    }
    TransactItem::Update {
        key: record.key(),
        update,
        condition: Some(open()),
    }
}

/// Assert another investigation is still open at commit time.
pub fn still_open(record: &InvestigationRecord) -> TransactItem {
    TransactItem::ConditionCheck {
        key: record.key(),
        condition: open(),
    }
}

fn open() -> Condition {
    Condition::item_exists().and(Condition::not_exists(CLOSE_DATE_ATTRIBUTE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_version_guard_matches_read_value() {
        let mut item = Item::new();
        item.set_key(&RecordKey::new("p", "s"));
        item.set(DATE_OF_UPDATE, json!("2025-01-01T00:00:00.000Z"));
        let guard = version_guard(&item);
        assert!(guard.evaluate(Some(&item)));

        let mut changed = item.clone();
        changed.set(DATE_OF_UPDATE, json!("2025-01-02T00:00:00.000Z"));
        assert!(!guard.evaluate(Some(&changed)));
        assert!(!guard.evaluate(None));
    }

    #[test]
    fn test_version_guard_without_date() {
        let mut item = Item::new();
        item.set_key(&RecordKey::new("p", "s"));
        let guard = version_guard(&item);
        assert!(guard.evaluate(Some(&item)));
        let mut stamped = item.clone();
        stamped.set(DATE_OF_UPDATE, json!("2025-01-02T00:00:00.000Z"));
        assert!(!guard.evaluate(Some(&stamped)));
    }

    #[test]
    fn test_reaffirm_moves_version_past_a_frozen_clock() {
        let mut item = Item::new();
        item.set_key(&RecordKey::new("p", "s"));
        item.set(DATE_OF_UPDATE, json!("2025-01-01T00:00:00.000Z"));
        item.set(ENCUMBERED_STATUS, json!("encumbered"));
        let now = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();

        let TransactItem::Update { update, condition, .. } =
            reaffirm_status(&item, "encumbered", now).unwrap()
        else {
            panic!("expected an update");
        };
        let condition = condition.unwrap();
        assert!(condition.evaluate(Some(&item)));

        let mut bumped = item.clone();
        update.apply(&mut bumped);
        assert_eq!(bumped.get_str(DATE_OF_UPDATE), Some("2025-01-01T00:00:00.001Z"));
        assert!(!version_guard(&item).evaluate(Some(&bumped)));

        let mut lifted = item.clone();
        lifted.set(ENCUMBERED_STATUS, json!("unencumbered"));
        assert!(!condition.evaluate(Some(&lifted)));
    }

    #[test]
    fn test_empty_plan_commits_without_store_call() {
        let store = compact_store::InMemoryRecordStore::new();
        store.fail_next_transaction("should not be reached");
        TransactionPlan::new().commit(&store).unwrap();
    }
}
