//! Fixture: providers written through the ingestion writer at chosen
//! times, and a rollback engine over the same store with its own clock.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use compact_core::{
    CompactCode, Jurisdiction, LicenseTypeAbbr, ManualClock, ProviderId, Timestamp,
};
use compact_recovery::{RollbackConfig, RollbackEngine, RollbackInput};
use compact_state::config::DEFAULT_EVENT_SOURCE;
use compact_state::model::keys::{
    license_sort_key, provider_partition_key, LICENSE_JURISDICTION_INDEX,
    LICENSE_JURISDICTION_KEY_ATTRIBUTE, PROVIDER_ID_ATTRIBUTE,
};
use compact_state::model::{JurisdictionLicenseStatus, PrivilegeEncumberedStatus};
use compact_state::{
    EncumbranceEngine, EncumbranceRequest, EngineConfig, EngineContext, EventPublisher,
    IngestOutcome, LicenseIngestor, LicenseUpload, PrivilegeRecord, ProviderAggregate,
    StoredRecord, UpdateTierBound,
};
use compact_store::{
    Consistency, IndexDefinition, InMemoryEventBus, InMemoryObjectStore, InMemoryRecordStore,
    Item, ObjectStore, RecordKey, RecordStore,
};

pub const WINDOW_START: &str = "2025-03-10T00:00:00Z";
pub const WINDOW_END: &str = "2025-03-11T00:00:00Z";

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn provider(n: u8) -> ProviderId {
    ProviderId::parse(&format!("00000000-0000-4000-8000-{n:012}")).unwrap()
}

pub struct Fixture {
    pub store: InMemoryRecordStore,
    pub bus: InMemoryEventBus,
    pub objects: InMemoryObjectStore,
    /// Drives the writers that set up each scenario.
    pub write_clock: ManualClock,
    /// Drives the rollback time budget.
    pub run_clock: ManualClock,
    pub ctx: EngineContext,
    pub compact: CompactCode,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryRecordStore::new().with_index(IndexDefinition::new(
            LICENSE_JURISDICTION_INDEX,
            LICENSE_JURISDICTION_KEY_ATTRIBUTE,
            PROVIDER_ID_ATTRIBUTE,
        ));
        let bus = InMemoryEventBus::new();
        let write_clock = ManualClock::new(ts("2025-03-01T00:00:00Z"));
        let ctx = EngineContext::new(
            Arc::new(store.clone()),
            Arc::new(bus.clone()),
            Arc::new(write_clock.clone()),
            EngineConfig::default(),
        );
        Self {
            store,
            bus,
            objects: InMemoryObjectStore::new(),
            write_clock,
            run_clock: ManualClock::new(ts("2025-04-01T00:00:00Z")),
            ctx,
            compact: CompactCode::new("aslp").unwrap(),
        }
    }

    /// Upload an `slp` license for `provider_id` at time `at`.
    pub fn upload(
        &self,
        provider_id: ProviderId,
        jurisdiction: &str,
        expires: NaiveDate,
        status: JurisdictionLicenseStatus,
        at: &str,
    ) -> IngestOutcome {
        self.write_clock.set(ts(at));
        LicenseIngestor::new(self.ctx.clone())
            .ingest(LicenseUpload {
                compact: self.compact.clone(),
                provider_id,
                jurisdiction: Jurisdiction::new(jurisdiction).unwrap(),
                license_type: "speech-language pathologist".to_string(),
                license_type_abbr: LicenseTypeAbbr::new("slp").unwrap(),
                license_number: Some("SLP-2002".to_string()),
                date_of_issuance: date(2020, 1, 1),
                date_of_expiration: expires,
                status,
                given_name: "Grace".to_string(),
                middle_name: None,
                family_name: "Hopper".to_string(),
            })
            .unwrap()
    }

    /// A provider whose `oh` license was first uploaded before the window.
    pub fn established(&self, provider_id: ProviderId) {
        self.upload(
            provider_id,
            "oh",
            date(2027, 1, 1),
            JurisdictionLicenseStatus::Active,
            "2025-03-01T08:00:00Z",
        );
    }

    pub fn renew(&self, provider_id: ProviderId, expires: NaiveDate, at: &str) {
        assert!(matches!(
            self.upload(provider_id, "oh", expires, JurisdictionLicenseStatus::Active, at),
            IngestOutcome::Updated(_)
        ));
    }

    pub fn encumber(&self, provider_id: ProviderId, at: &str) {
        self.write_clock.set(ts(at));
        EncumbranceEngine::new(self.ctx.clone())
            .encumber_license(EncumbranceRequest {
                compact: self.compact.clone(),
                provider_id,
                jurisdiction: Jurisdiction::new("oh").unwrap(),
                license_type_abbr: LicenseTypeAbbr::new("slp").unwrap(),
                effective_start_date: ts(at).date(),
                encumbrance_type: "suspension".to_string(),
                clinical_privilege_action_category: "Fraud".to_string(),
                submitting_user: "board-admin".to_string(),
            })
            .unwrap();
    }

    /// A privilege in `jurisdiction` derived from the `oh` license, as the
    /// purchase flow writes it: no history entry, only `dateOfUpdate`.
    pub fn purchase_privilege(&self, provider_id: ProviderId, jurisdiction: &str, at: &str) {
        let record = PrivilegeRecord {
            provider_id,
            compact: self.compact.clone(),
            jurisdiction: Jurisdiction::new(jurisdiction).unwrap(),
            license_jurisdiction: Jurisdiction::new("oh").unwrap(),
            license_type: "speech-language pathologist".to_string(),
            license_type_abbr: LicenseTypeAbbr::new("slp").unwrap(),
            privilege_id: format!("SLP-{}-1", jurisdiction.to_uppercase()),
            date_of_issuance: ts(at).date(),
            date_of_expiration: date(2027, 1, 1),
            encumbered_status: PrivilegeEncumberedStatus::Unencumbered,
            investigation_status: None,
            home_jurisdiction_change_status: None,
            license_deactivated_status: None,
            date_of_update: ts(at),
        };
        self.store.seed([record.to_item().unwrap()]).unwrap();
    }

    pub fn config(&self) -> RollbackConfig {
        RollbackConfig {
            scan_page_size: 2,
            ..RollbackConfig::default()
        }
    }

    pub fn engine(&self) -> RollbackEngine {
        self.engine_with(Arc::new(self.objects.clone()))
    }

    pub fn engine_with(&self, objects: Arc<dyn ObjectStore>) -> RollbackEngine {
        RollbackEngine::new(
            Arc::new(self.store.clone()),
            objects,
            EventPublisher::new(Arc::new(self.bus.clone()), DEFAULT_EVENT_SOURCE),
            Arc::new(self.run_clock.clone()),
            self.config(),
        )
        .unwrap()
    }

    /// Make every time-budget check after the first provider see the soft
    /// cutoff as passed.
    pub fn slow_run_clock(&mut self) {
        self.run_clock = ManualClock::ticking(ts("2025-04-01T00:00:00Z"), Duration::minutes(13));
    }

    pub fn input(&self, execution_name: &str) -> RollbackInput {
        RollbackInput {
            compact: "aslp".to_string(),
            jurisdiction: "oh".to_string(),
            start_date_time: WINDOW_START.to_string(),
            end_date_time: WINDOW_END.to_string(),
            rollback_reason: "malformed upload file".to_string(),
            execution_name: execution_name.to_string(),
            providers_processed: 0,
            continue_from_provider_id: None,
        }
    }

    pub fn license_key(&self, provider_id: ProviderId, jurisdiction: &str) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &provider_id),
            license_sort_key(
                &self.compact,
                &Jurisdiction::new(jurisdiction).unwrap(),
                &LicenseTypeAbbr::new("slp").unwrap(),
            ),
        )
    }

    pub fn license_item(&self, provider_id: ProviderId, jurisdiction: &str) -> Option<Item> {
        self.store
            .get_item(&self.license_key(provider_id, jurisdiction), Consistency::Strong)
            .unwrap()
    }

    pub fn aggregate(&self, provider_id: ProviderId) -> Option<ProviderAggregate> {
        ProviderAggregate::load(
            &self.store,
            &self.compact,
            &provider_id,
            UpdateTierBound::ALL,
            Consistency::Strong,
        )
        .ok()
    }

    pub fn results(&self, execution_name: &str) -> serde_json::Value {
        self.objects
            .get_json(&format!("{execution_name}/rollback-results.json"))
            .unwrap()
            .unwrap()
    }
}
