//! # Provider Aggregate
//!
//! Reads every record of one provider into memory once, so the engines can
//! answer "is anything else still encumbered" or "is another investigation
//! still open" without further store reads. Cost is proportional to the
//! records of one provider, never to the size of the compact.
//!
//! History is optional: [`UpdateTierBound::None`] reads current state only,
//! `UpTo(tier)` adds update records of tiers `1..=tier`.

use std::collections::BTreeMap;

use tracing::debug;

use compact_core::{AdverseActionId, CompactCode, InvestigationId, Jurisdiction, LicenseTypeAbbr, ProviderId};
use compact_store::{query_all, Consistency, Item, KeyCondition, Query, RecordStore};

use crate::error::{EngineError, ModelError};
use crate::model::keys::{provider_partition_key, state_prefix, update_tier_prefix};
use crate::model::{
    AdverseActionRecord, InvestigationRecord, LicenseRecord, PrivilegeRecord, ProviderRecord,
    RecordType, StoredRecord, UpdateRecord, UpdateSubject, UpdateTierBound,
};
use crate::target::{RecordTarget, TargetRecord};

/// Everything stored for one provider, decoded.
#[derive(Debug, Clone)]
pub struct ProviderAggregate {
    compact: CompactCode,
    provider_id: ProviderId,
    items: BTreeMap<String, Item>,
    provider: Option<ProviderRecord>,
    licenses: Vec<LicenseRecord>,
    privileges: Vec<PrivilegeRecord>,
    adverse_actions: Vec<AdverseActionRecord>,
    investigations: Vec<InvestigationRecord>,
    updates: Vec<UpdateRecord>,
}

impl ProviderAggregate {
    /// Page through the provider partition.
    ///
    /// Fails with [`EngineError::NotFound`] when the partition is empty.
    pub fn load(
        store: &dyn RecordStore,
        compact: &CompactCode,
        provider_id: &ProviderId,
        bound: UpdateTierBound,
        consistency: Consistency,
    ) -> Result<Self, EngineError> {
        let pk = provider_partition_key(compact, provider_id);
        let mut items = query_all(
            store,
            Query::partition(pk.clone())
                .with_sort_key(KeyCondition::BeginsWith(state_prefix(compact))),
            consistency,
        )?;
        for tier in bound.tiers() {
            items.extend(query_all(
                store,
                Query::partition(pk.clone())
                    .with_sort_key(KeyCondition::BeginsWith(update_tier_prefix(compact, tier))),
                consistency,
            )?);
        }
        if items.is_empty() {
            return Err(EngineError::NotFound(format!(
                "provider {provider_id} in compact {compact}"
            )));
        }
        debug!(
            compact = %compact,
            provider_id = %provider_id,
            items = items.len(),
            "loaded provider aggregate"
        );
        Ok(Self::from_items(compact.clone(), *provider_id, items)?)
    }

    /// Decode already-fetched items. Items of unrecognised types are kept
    /// raw but not decoded.
    pub fn from_items(
        compact: CompactCode,
        provider_id: ProviderId,
        items: Vec<Item>,
    ) -> Result<Self, ModelError> {
        let mut aggregate = Self {
            compact,
            provider_id,
            items: BTreeMap::new(),
            provider: None,
            licenses: Vec::new(),
            privileges: Vec::new(),
            adverse_actions: Vec::new(),
            investigations: Vec::new(),
            updates: Vec::new(),
        };
        for item in items {
            match RecordType::of_item(&item) {
                Some(RecordType::Provider) => {
                    aggregate.provider = Some(ProviderRecord::from_item(&item)?);
                }
                Some(RecordType::License) => aggregate.licenses.push(LicenseRecord::from_item(&item)?),
                Some(RecordType::Privilege) => {
                    aggregate.privileges.push(PrivilegeRecord::from_item(&item)?)
                }
                Some(RecordType::AdverseAction) => aggregate
                    .adverse_actions
                    .push(AdverseActionRecord::from_item(&item)?),
                Some(RecordType::Investigation) => aggregate
                    .investigations
                    .push(InvestigationRecord::from_item(&item)?),
                Some(RecordType::Update) => aggregate.updates.push(UpdateRecord::from_item(&item)?),
                None => {}
            }
            let key = item.key()?;
            aggregate.items.insert(key.sk, item);
        }
        aggregate
            .updates
            .sort_by(|a, b| (a.create_date, a.key().sk).cmp(&(b.create_date, b.key().sk)));
        Ok(aggregate)
    }

    pub fn compact(&self) -> &CompactCode {
        &self.compact
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    pub fn partition_key(&self) -> String {
        provider_partition_key(&self.compact, &self.provider_id)
    }

    pub fn provider(&self) -> Option<&ProviderRecord> {
        self.provider.as_ref()
    }

    pub fn licenses(&self) -> &[LicenseRecord] {
        &self.licenses
    }

    pub fn privileges(&self) -> &[PrivilegeRecord] {
        &self.privileges
    }

    pub fn adverse_actions(&self) -> &[AdverseActionRecord] {
        &self.adverse_actions
    }

    pub fn investigations(&self) -> &[InvestigationRecord] {
        &self.investigations
    }

    /// Update records ordered by create date.
    pub fn updates(&self) -> &[UpdateRecord] {
        &self.updates
    }

    /// Every raw item, keyed by sort key.
    pub fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    /// Raw item by sort key.
    pub fn item(&self, sort_key: &str) -> Option<&Item> {
        self.items.get(sort_key)
    }

    // ─── Licenses and privileges ─────────────────────────────────────

    pub fn license(
        &self,
        jurisdiction: &Jurisdiction,
        license_type_abbr: &LicenseTypeAbbr,
    ) -> Option<&LicenseRecord> {
        self.licenses
            .iter()
            .find(|l| &l.jurisdiction == jurisdiction && &l.license_type_abbr == license_type_abbr)
    }

    pub fn privilege(
        &self,
        jurisdiction: &Jurisdiction,
        license_type_abbr: &LicenseTypeAbbr,
    ) -> Option<&PrivilegeRecord> {
        self.privileges
            .iter()
            .find(|p| &p.jurisdiction == jurisdiction && &p.license_type_abbr == license_type_abbr)
    }

    /// Resolve a target to its record and raw item.
    pub fn target(&self, target: &RecordTarget) -> Option<TargetRecord<'_>> {
        let item = self.item(&target.sort_key(&self.compact))?;
        match target {
            RecordTarget::License {
                jurisdiction,
                license_type_abbr,
            } => self
                .license(jurisdiction, license_type_abbr)
                .map(|record| TargetRecord::License { record, item }),
            RecordTarget::Privilege {
                jurisdiction,
                license_type_abbr,
            } => self
                .privilege(jurisdiction, license_type_abbr)
                .map(|record| TargetRecord::Privilege { record, item }),
        }
    }

    /// Privileges still following `license`.
    pub fn privileges_following<'a>(
        &'a self,
        license: &'a LicenseRecord,
    ) -> impl Iterator<Item = &'a PrivilegeRecord> + 'a {
        self.privileges.iter().filter(move |p| p.follows(license))
    }

    /// Home license a privilege derives from.
    pub fn home_license(&self, privilege: &PrivilegeRecord) -> Option<&LicenseRecord> {
        self.license(&privilege.license_jurisdiction, &privilege.license_type_abbr)
    }

    /// Whether a license or privilege other than `target` is encumbered by
    /// its own adverse action.
    pub fn encumbered_elsewhere(&self, target: &RecordTarget) -> bool {
        let licenses = self.licenses.iter().filter(|l| {
            l.is_encumbered()
                && RecordTarget::license(l.jurisdiction.clone(), l.license_type_abbr.clone())
                    != *target
        });
        let privileges = self.privileges.iter().filter(|p| {
            p.is_encumbered()
                && RecordTarget::privilege(p.jurisdiction.clone(), p.license_type_abbr.clone())
                    != *target
        });
        licenses.count() + privileges.count() > 0
    }

    // ─── Adverse actions ─────────────────────────────────────────────

    pub fn adverse_action(
        &self,
        target: &RecordTarget,
        id: &AdverseActionId,
    ) -> Option<&AdverseActionRecord> {
        self.adverse_actions
            .iter()
            .find(|a| &a.adverse_action_id == id && a.target() == *target)
    }

    pub fn adverse_actions_for<'a>(
        &'a self,
        target: &'a RecordTarget,
    ) -> impl Iterator<Item = &'a AdverseActionRecord> + 'a {
        self.adverse_actions.iter().filter(move |a| a.target() == *target)
    }

    /// Unlifted actions on `target`, optionally ignoring one.
    pub fn unlifted_adverse_actions_for<'a>(
        &'a self,
        target: &'a RecordTarget,
        excluding: Option<&'a AdverseActionId>,
    ) -> Vec<&'a AdverseActionRecord> {
        self.adverse_actions_for(target)
            .filter(|a| a.is_unlifted() && Some(&a.adverse_action_id) != excluding)
            .collect()
    }

    /// Unlifted actions anywhere under the provider, ignoring one.
    pub fn unlifted_adverse_actions_excluding(
        &self,
        excluding: &AdverseActionId,
    ) -> Vec<&AdverseActionRecord> {
        self.adverse_actions
            .iter()
            .filter(|a| a.is_unlifted() && &a.adverse_action_id != excluding)
            .collect()
    }

    // ─── Investigations ──────────────────────────────────────────────

    pub fn investigation(
        &self,
        target: &RecordTarget,
        id: &InvestigationId,
    ) -> Option<&InvestigationRecord> {
        self.investigations
            .iter()
            .find(|i| &i.investigation_id == id && i.target() == *target)
    }

    /// Open investigations on `target`, optionally ignoring one.
    pub fn open_investigations_for<'a>(
        &'a self,
        target: &'a RecordTarget,
        excluding: Option<&'a InvestigationId>,
    ) -> Vec<&'a InvestigationRecord> {
        self.investigations
            .iter()
            .filter(|i| i.is_open() && i.target() == *target && Some(&i.investigation_id) != excluding)
            .collect()
    }

    // ─── History ─────────────────────────────────────────────────────

    /// Update records about one subject, oldest first.
    pub fn updates_for<'a>(
        &'a self,
        subject: &UpdateSubject,
    ) -> impl Iterator<Item = &'a UpdateRecord> + 'a {
        let subject = subject.clone();
        self.updates.iter().filter(move |u| u.subject == subject)
    }
}
