//! Shared harness: one provider with a home license in `oh` and two
//! privileges (`ne`, `ky`) derived from it.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use compact_core::{
    AdverseActionId, CompactCode, Jurisdiction, LicenseTypeAbbr, ManualClock, ProviderId, Timestamp,
};
use compact_state::model::keys::{
    LICENSE_JURISDICTION_INDEX, LICENSE_JURISDICTION_KEY_ATTRIBUTE, PROVIDER_ID_ATTRIBUTE,
};
use compact_state::model::{JurisdictionLicenseStatus, PrivilegeEncumberedStatus};
use compact_state::{
    EncumbranceEngine, EncumbranceRequest, EngineConfig, EngineContext, IngestOutcome, InvestigationEngine,
    LicenseIngestor, LicenseRecord, LicenseUpload, LiftRequest, PrivilegeRecord,
    ProviderAggregate, ProviderRecord, RecordTarget, StoredRecord, UpdateTierBound,
};
use compact_store::{
    BatchGetOutput, Condition, Consistency, IndexDefinition, IndexQuery, InMemoryEventBus,
    InMemoryRecordStore, Item, Page, Query, RecordKey, RecordStore, StoreError, TransactItem,
    UpdateExpression,
};
use parking_lot::Mutex;

type Interleaved = Box<dyn FnOnce() + Send>;

/// Runs one competing operation against the shared store just before the
/// next transaction submitted through it. Reads pass straight through, so
/// the wrapped engine decides on the state as it was before the competitor
/// committed.
pub struct InterleavedStore {
    inner: InMemoryRecordStore,
    before_next_write: Mutex<Option<Interleaved>>,
}

impl InterleavedStore {
    pub fn new(inner: InMemoryRecordStore, competitor: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            before_next_write: Mutex::new(Some(Box::new(competitor))),
        }
    }
}

impl RecordStore for InterleavedStore {
    fn get_item(&self, key: &RecordKey, consistency: Consistency) -> Result<Option<Item>, StoreError> {
        self.inner.get_item(key, consistency)
    }

    fn query(&self, query: &Query, consistency: Consistency) -> Result<Page, StoreError> {
        self.inner.query(query, consistency)
    }

    fn query_index(&self, query: &IndexQuery) -> Result<Page, StoreError> {
        self.inner.query_index(query)
    }

    fn put_item(&self, item: Item, condition: Option<&Condition>) -> Result<(), StoreError> {
        self.inner.put_item(item, condition)
    }

    fn update_item(
        &self,
        key: &RecordKey,
        update: &UpdateExpression,
        condition: Option<&Condition>,
    ) -> Result<Item, StoreError> {
        self.inner.update_item(key, update, condition)
    }

    fn delete_item(&self, key: &RecordKey, condition: Option<&Condition>) -> Result<(), StoreError> {
        self.inner.delete_item(key, condition)
    }

    fn transact_write(&self, items: Vec<TransactItem>) -> Result<(), StoreError> {
        let competitor = self.before_next_write.lock().take();
        if let Some(competitor) = competitor {
            competitor();
        }
        self.inner.transact_write(items)
    }

    fn batch_get(&self, keys: &[RecordKey], consistency: Consistency) -> Result<BatchGetOutput, StoreError> {
        self.inner.batch_get(keys, consistency)
    }
}

pub struct Harness {
    pub store: InMemoryRecordStore,
    pub bus: InMemoryEventBus,
    pub clock: ManualClock,
    pub ctx: EngineContext,
    pub compact: CompactCode,
    pub provider_id: ProviderId,
}

pub fn j(code: &str) -> Jurisdiction {
    Jurisdiction::new(code).unwrap()
}

pub fn slp() -> LicenseTypeAbbr {
    LicenseTypeAbbr::new("slp").unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryRecordStore::new().with_index(IndexDefinition::new(
            LICENSE_JURISDICTION_INDEX,
            LICENSE_JURISDICTION_KEY_ATTRIBUTE,
            PROVIDER_ID_ATTRIBUTE,
        ));
        let bus = InMemoryEventBus::new();
        let clock = ManualClock::ticking(
            Timestamp::parse("2025-03-01T09:00:00Z").unwrap(),
            Duration::seconds(1),
        );
        let ctx = EngineContext::new(
            Arc::new(store.clone()),
            Arc::new(bus.clone()),
            Arc::new(clock.clone()),
            EngineConfig::default(),
        );
        let harness = Self {
            store,
            bus,
            clock,
            ctx,
            compact: CompactCode::new("aslp").unwrap(),
            provider_id: ProviderId::new(),
        };
        assert_eq!(
            harness.upload("oh", date(2027, 1, 1), JurisdictionLicenseStatus::Active),
            IngestOutcome::Created
        );
        for privilege in ["ne", "ky"] {
            harness.add_privilege(privilege);
        }
        harness
    }

    pub fn upload(
        &self,
        jurisdiction: &str,
        expires: NaiveDate,
        status: JurisdictionLicenseStatus,
    ) -> IngestOutcome {
        self.ingest(self.upload_row(jurisdiction, expires, status))
    }

    pub fn ingest(&self, row: LicenseUpload) -> IngestOutcome {
        LicenseIngestor::new(self.ctx.clone()).ingest(row).unwrap()
    }

    pub fn upload_row(
        &self,
        jurisdiction: &str,
        expires: NaiveDate,
        status: JurisdictionLicenseStatus,
    ) -> LicenseUpload {
        LicenseUpload {
            compact: self.compact.clone(),
            provider_id: self.provider_id,
            jurisdiction: j(jurisdiction),
            license_type: "speech-language pathologist".to_string(),
            license_type_abbr: slp(),
            license_number: Some("SLP-1001".to_string()),
            date_of_issuance: date(2020, 1, 1),
            date_of_expiration: expires,
            status,
            given_name: "Ada".to_string(),
            middle_name: None,
            family_name: "Lovelace".to_string(),
        }
    }

    pub fn add_privilege(&self, jurisdiction: &str) {
        let record = PrivilegeRecord {
            provider_id: self.provider_id,
            compact: self.compact.clone(),
            jurisdiction: j(jurisdiction),
            license_jurisdiction: j("oh"),
            license_type: "speech-language pathologist".to_string(),
            license_type_abbr: slp(),
            privilege_id: format!("SLP-{}-1", jurisdiction.to_uppercase()),
            date_of_issuance: date(2024, 6, 1),
            date_of_expiration: date(2027, 1, 1),
            encumbered_status: PrivilegeEncumberedStatus::Unencumbered,
            investigation_status: None,
            home_jurisdiction_change_status: None,
            license_deactivated_status: None,
            date_of_update: self.clock_now(),
        };
        self.store.seed([record.to_item().unwrap()]).unwrap();
    }

    fn clock_now(&self) -> Timestamp {
        use compact_core::Clock;
        self.clock.now()
    }

    /// A context whose first transaction commits after `competitor` has
    /// run against the shared store.
    pub fn interleaved(&self, competitor: impl FnOnce() + Send + 'static) -> EngineContext {
        EngineContext::new(
            Arc::new(InterleavedStore::new(self.store.clone(), competitor)),
            Arc::new(self.bus.clone()),
            Arc::new(self.clock.clone()),
            EngineConfig::default(),
        )
    }

    /// Number of adverse actions without a lift date.
    pub fn unlifted(&self) -> usize {
        self.aggregate()
            .adverse_actions()
            .iter()
            .filter(|a| a.is_unlifted())
            .count()
    }

    pub fn encumbrances(&self) -> EncumbranceEngine {
        EncumbranceEngine::new(self.ctx.clone())
    }

    pub fn investigations(&self) -> InvestigationEngine {
        InvestigationEngine::new(self.ctx.clone())
    }

    pub fn aggregate(&self) -> ProviderAggregate {
        ProviderAggregate::load(
            &self.store,
            &self.compact,
            &self.provider_id,
            UpdateTierBound::ALL,
            Consistency::Strong,
        )
        .unwrap()
    }

    pub fn license(&self) -> LicenseRecord {
        self.aggregate().license(&j("oh"), &slp()).unwrap().clone()
    }

    pub fn privilege(&self, jurisdiction: &str) -> PrivilegeRecord {
        self.aggregate()
            .privilege(&j(jurisdiction), &slp())
            .unwrap()
            .clone()
    }

    pub fn provider(&self) -> ProviderRecord {
        self.aggregate().provider().unwrap().clone()
    }

    pub fn license_target(&self) -> RecordTarget {
        RecordTarget::license(j("oh"), slp())
    }

    pub fn privilege_target(&self, jurisdiction: &str) -> RecordTarget {
        RecordTarget::privilege(j(jurisdiction), slp())
    }

    pub fn encumber_request(&self, jurisdiction: &str) -> EncumbranceRequest {
        EncumbranceRequest {
            compact: self.compact.clone(),
            provider_id: self.provider_id,
            jurisdiction: j(jurisdiction),
            license_type_abbr: slp(),
            effective_start_date: date(2025, 2, 15),
            encumbrance_type: "suspension".to_string(),
            clinical_privilege_action_category: "Unsafe Practice or Substandard Care".to_string(),
            submitting_user: "board-admin".to_string(),
        }
    }

    pub fn lift_request(&self, jurisdiction: &str, id: AdverseActionId) -> LiftRequest {
        LiftRequest {
            compact: self.compact.clone(),
            provider_id: self.provider_id,
            jurisdiction: j(jurisdiction),
            license_type_abbr: slp(),
            adverse_action_id: id,
            effective_lift_date: date(2025, 4, 1),
            lifting_user: "board-admin".to_string(),
        }
    }
}
