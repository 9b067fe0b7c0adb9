//! # Provider Classification
//!
//! Decides, from one provider's current records and full update history,
//! what a rollback of the window `[start, end)` may do to it.
//!
//! A provider is skipped whenever anything other than the faulty upload
//! touched it in or after the window: a non-upload update, a privilege
//! purchase or change, an adverse action or investigation, or any update
//! at or after the window end. A license created in the window that a
//! privilege already depends on is never deleted. It is also skipped when update records reference a
//! license that no longer exists. Otherwise each license of the
//! jurisdiction is deleted (first uploaded inside the window) or restored
//! to the `previous` snapshot of its earliest in-window update.

use std::collections::BTreeSet;

use compact_core::{Jurisdiction, LicenseTypeAbbr, Timestamp};
use compact_state::model::keys::provider_sort_key;
use compact_state::{
    EngineError, PrivilegeRecord, ProviderAggregate, RecordTarget, StoredRecord, UpdateRecord,
    UpdateSubject,
};
use compact_store::{Condition, Item, RecordKey, StoreError, TransactItem};

use crate::report::{IneligibleUpdate, LicenseRevert, RevertAction, RevertedProvider, SkippedProvider};
use crate::request::RollbackRequest;

/// Outcome of classifying one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Nothing in the window concerns this provider.
    NoChange,
    Skip(SkippedProvider),
    Rollback(ProviderRollback),
}

/// A current-state record to restore or remove.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordChange {
    Revert {
        /// The snapshot to write back.
        restored: Item,
        /// The version being replaced.
        current: Item,
    },
    Delete {
        current: Item,
    },
}

impl RecordChange {
    pub fn action(&self) -> RevertAction {
        match self {
            Self::Revert { .. } => RevertAction::Revert,
            Self::Delete { .. } => RevertAction::Delete,
        }
    }

    fn transact_item(&self) -> Result<TransactItem, StoreError> {
        Ok(match self {
            Self::Revert { restored, current } => TransactItem::Put {
                item: restored.clone(),
                condition: Some(compact_state::txn::version_guard(current)),
            },
            Self::Delete { current } => TransactItem::Delete {
                key: current.key()?,
                condition: Some(compact_state::txn::version_guard(current)),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LicenseChange {
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub change: RecordChange,
}

/// Every write that undoes the window for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRollback {
    pub licenses: Vec<LicenseChange>,
    pub provider: Option<RecordChange>,
    /// Update records to remove.
    pub stale_updates: Vec<RecordKey>,
}

impl ProviderRollback {
    /// The compensating transaction.
    pub fn transact_items(&self) -> Result<Vec<TransactItem>, StoreError> {
        let mut items = Vec::with_capacity(self.licenses.len() + self.stale_updates.len() + 1);
        for license in &self.licenses {
            items.push(license.change.transact_item()?);
        }
        if let Some(provider) = &self.provider {
            items.push(provider.transact_item()?);
        }
        items.extend(self.stale_updates.iter().map(|key| TransactItem::Delete {
            key: key.clone(),
            condition: Some(Condition::item_exists()),
        }));
        Ok(items)
    }

    /// Licenses restored to a snapshot (not deleted).
    pub fn reverted_licenses(&self) -> impl Iterator<Item = &LicenseChange> {
        self.licenses
            .iter()
            .filter(|l| matches!(l.change, RecordChange::Revert { .. }))
    }

    pub fn summary(&self, aggregate: &ProviderAggregate) -> RevertedProvider {
        RevertedProvider {
            provider_id: *aggregate.provider_id(),
            licenses_reverted: self
                .licenses
                .iter()
                .map(|l| LicenseRevert {
                    jurisdiction: l.jurisdiction.clone(),
                    license_type_abbr: l.license_type_abbr.clone(),
                    action: l.change.action(),
                })
                .collect(),
            provider_record: self.provider.as_ref().map(RecordChange::action),
            updates_deleted: self.stale_updates.iter().map(|k| k.sk.clone()).collect(),
        }
    }
}

fn ineligible_update(update: &UpdateRecord, reason: &str) -> IneligibleUpdate {
    IneligibleUpdate {
        record_type: match update.subject {
            UpdateSubject::Provider => "provider",
            UpdateSubject::License { .. } => "license",
            UpdateSubject::Privilege { .. } => "privilege",
        }
        .to_string(),
        subject: update.subject.path(),
        type_of_update: update.update_type.to_string(),
        update_time: update.create_date,
        reason: reason.to_string(),
    }
}

fn ineligible_record(
    record_type: &str,
    target: &RecordTarget,
    type_of_update: &str,
    at: Timestamp,
    reason: &str,
) -> IneligibleUpdate {
    IneligibleUpdate {
        record_type: record_type.to_string(),
        subject: target.update_subject().path(),
        type_of_update: type_of_update.to_string(),
        update_time: at,
        reason: reason.to_string(),
    }
}

fn privilege_target(privilege: &PrivilegeRecord) -> RecordTarget {
    RecordTarget::privilege(privilege.jurisdiction.clone(), privilege.license_type_abbr.clone())
}

fn update_key(update: &UpdateRecord) -> RecordKey {
    update.key()
}

/// Classify one provider for `request`.
///
/// `aggregate` must be a strongly consistent read including every history
/// tier.
pub fn classify(
    aggregate: &ProviderAggregate,
    request: &RollbackRequest,
) -> Result<Classification, EngineError> {
    let provider_id = *aggregate.provider_id();
    let jurisdiction = &request.jurisdiction;

    let orphans: Vec<IneligibleUpdate> = aggregate
        .updates()
        .iter()
        .filter(|u| match &u.subject {
            UpdateSubject::License {
                jurisdiction: j,
                license_type_abbr,
            } => j == jurisdiction && aggregate.license(j, license_type_abbr).is_none(),
            _ => false,
        })
        .map(|u| ineligible_update(u, "update references a license with no current record"))
        .collect();
    if !orphans.is_empty() {
        return Ok(Classification::Skip(SkippedProvider {
            provider_id,
            reason: "orphaned update records; the license they describe no longer exists"
                .to_string(),
            ineligible_updates: orphans,
        }));
    }

    let ineligible = ineligible_changes(aggregate, request);
    if !ineligible.is_empty() {
        return Ok(Classification::Skip(SkippedProvider {
            provider_id,
            reason: "provider was changed in or after the window by something other than the license upload"
                .to_string(),
            ineligible_updates: ineligible,
        }));
    }

    let compact = aggregate.compact();
    let raw = |sort_key: &str| {
        aggregate.item(sort_key).cloned().ok_or_else(|| {
            EngineError::Internal(format!("{sort_key} decoded without a raw item"))
        })
    };

    let mut licenses = Vec::new();
    let mut stale_updates: Vec<RecordKey> = Vec::new();
    let mut removed: BTreeSet<String> = BTreeSet::new();
    for license in aggregate
        .licenses()
        .iter()
        .filter(|l| &l.jurisdiction == jurisdiction)
    {
        let subject = UpdateSubject::License {
            jurisdiction: license.jurisdiction.clone(),
            license_type_abbr: license.license_type_abbr.clone(),
        };
        let current = raw(&subject.record_sort_key(compact))?;
        let change = if request.contains(license.first_upload_date) {
            stale_updates.extend(aggregate.updates_for(&subject).map(update_key));
            RecordChange::Delete { current }
        } else {
            let mut in_window = aggregate
                .updates_for(&subject)
                .filter(|u| u.created_within(request.start, request.end))
                .peekable();
            let Some(earliest) = in_window.peek().copied() else {
                continue;
            };
            let restored = earliest.previous_item();
            stale_updates.extend(in_window.map(update_key));
            RecordChange::Revert { restored, current }
        };
        if let RecordChange::Delete { current } = &change {
            removed.insert(current.key()?.sk);
        }
        licenses.push(LicenseChange {
            jurisdiction: license.jurisdiction.clone(),
            license_type_abbr: license.license_type_abbr.clone(),
            change,
        });
    }

    let provider_sk = provider_sort_key(compact);
    let deletes_license = licenses
        .iter()
        .any(|l| matches!(l.change, RecordChange::Delete { .. }));
    removed.extend(stale_updates.iter().map(|k| k.sk.clone()));
    let provider_history: Vec<&UpdateRecord> =
        aggregate.updates_for(&UpdateSubject::Provider).collect();
    let provider_history_keys: BTreeSet<String> =
        provider_history.iter().map(|u| u.key().sk).collect();
    let nothing_else_remains = aggregate.items().keys().all(|sk| {
        sk == &provider_sk || removed.contains(sk) || provider_history_keys.contains(sk)
    });

    let provider = match aggregate.provider() {
        Some(_) if deletes_license && nothing_else_remains => {
            stale_updates.extend(provider_history.iter().map(|u| update_key(u)));
            Some(RecordChange::Delete {
                current: raw(&provider_sk)?,
            })
        }
        Some(_) => {
            let in_window: Vec<&UpdateRecord> = provider_history
                .iter()
                .copied()
                .filter(|u| u.created_within(request.start, request.end))
                .collect();
            match in_window.first() {
                Some(earliest) => {
                    let change = RecordChange::Revert {
                        restored: earliest.previous_item(),
                        current: raw(&provider_sk)?,
                    };
                    stale_updates.extend(in_window.iter().map(|u| update_key(u)));
                    Some(change)
                }
                None => None,
            }
        }
        None => None,
    };

    if licenses.is_empty() && provider.is_none() {
        return Ok(Classification::NoChange);
    }
    Ok(Classification::Rollback(ProviderRollback {
        licenses,
        provider,
        stale_updates,
    }))
}

fn ineligible_changes(aggregate: &ProviderAggregate, request: &RollbackRequest) -> Vec<IneligibleUpdate> {
    let mut ineligible = Vec::new();
    for update in aggregate.updates() {
        if update.create_date >= request.end {
            ineligible.push(ineligible_update(update, "updated after the rollback window"));
        } else if request.contains(update.create_date) {
            if let UpdateSubject::Privilege { .. } = update.subject {
                ineligible.push(ineligible_update(update, "privilege changed within the window"));
            } else if !update.update_type.is_upload_related() {
                ineligible.push(ineligible_update(
                    update,
                    "change within the window is not from a license upload",
                ));
            }
        }
    }
    for license in aggregate
        .licenses()
        .iter()
        .filter(|l| l.jurisdiction == request.jurisdiction && l.first_upload_date >= request.end)
    {
        ineligible.push(ineligible_record(
            "license",
            &RecordTarget::license(license.jurisdiction.clone(), license.license_type_abbr.clone()),
            "licenseUpload",
            license.first_upload_date,
            "license first uploaded after the rollback window",
        ));
    }
    // Privileges are bought without a history entry, so their own
    // timestamp is the only trace of an in-window purchase.
    for privilege in aggregate
        .privileges()
        .iter()
        .filter(|p| p.date_of_update >= request.start)
    {
        ineligible.push(ineligible_record(
            "privilege",
            &privilege_target(privilege),
            "privilege",
            privilege.date_of_update,
            "privilege created or changed in or after the window",
        ));
    }
    for license in aggregate
        .licenses()
        .iter()
        .filter(|l| l.jurisdiction == request.jurisdiction && request.contains(l.first_upload_date))
    {
        for privilege in aggregate.privileges_following(license) {
            ineligible.push(ineligible_record(
                "privilege",
                &privilege_target(privilege),
                "privilege",
                privilege.date_of_update,
                "privilege depends on a license first uploaded within the window",
            ));
        }
    }
    for action in aggregate
        .adverse_actions()
        .iter()
        .filter(|a| a.date_of_update >= request.start)
    {
        ineligible.push(ineligible_record(
            "adverseAction",
            &action.target(),
            &action.encumbrance_type,
            action.date_of_update,
            "adverse action created or lifted in or after the window",
        ));
    }
    for investigation in aggregate
        .investigations()
        .iter()
        .filter(|i| i.date_of_update >= request.start)
    {
        ineligible.push(ineligible_record(
            "investigation",
            &investigation.target(),
            "investigation",
            investigation.date_of_update,
            "investigation opened or closed in or after the window",
        ));
    }
    ineligible
}
