use std::sync::Arc;

use chrono::NaiveDate;

use compact_cli::inspect::{run_inspect, InspectArgs};
use compact_cli::rollback::{run_rollback, RollbackArgs};
use compact_cli::snapshot;
use compact_core::{CompactCode, Jurisdiction, LicenseTypeAbbr, ManualClock, ProviderId, Timestamp};
use compact_state::model::JurisdictionLicenseStatus;
use compact_state::{
    EngineConfig, EngineContext, LicenseIngestor, LicenseUpload, ProviderAggregate, UpdateTierBound,
};
use compact_store::{Consistency, InMemoryEventBus, InMemoryRecordStore};

fn write_snapshot(dir: &std::path::Path, provider_id: ProviderId) -> std::path::PathBuf {
    let store = InMemoryRecordStore::new();
    let clock = ManualClock::new(Timestamp::parse("2025-03-01T00:00:00Z").unwrap());
    let ctx = EngineContext::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryEventBus::new()),
        Arc::new(clock.clone()),
        EngineConfig::default(),
    );
    let ingestor = LicenseIngestor::new(ctx);
    for (expires, at) in [(2027, "2025-03-01T00:00:00Z"), (2029, "2025-03-10T12:00:00Z")] {
        clock.set(Timestamp::parse(at).unwrap());
        ingestor
            .ingest(LicenseUpload {
                compact: CompactCode::new("aslp").unwrap(),
                provider_id,
                jurisdiction: Jurisdiction::new("oh").unwrap(),
                license_type: "audiologist".to_string(),
                license_type_abbr: LicenseTypeAbbr::new("aud").unwrap(),
                license_number: None,
                date_of_issuance: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                date_of_expiration: NaiveDate::from_ymd_opt(expires, 1, 1).unwrap(),
                status: JurisdictionLicenseStatus::Active,
                given_name: "Alan".to_string(),
                middle_name: None,
                family_name: "Turing".to_string(),
            })
            .unwrap();
    }
    let path = dir.join("store.json");
    store.save_json_file(&path).unwrap();
    path
}

fn rollback_args(dir: &std::path::Path, snapshot: std::path::PathBuf) -> RollbackArgs {
    let config = dir.join("rollback.yaml");
    std::fs::write(&config, "softCutoffSecs: 600\n").unwrap();
    RollbackArgs {
        snapshot,
        output: None,
        results_dir: dir.join("results"),
        config: Some(config),
        compact: "aslp".to_string(),
        jurisdiction: "oh".to_string(),
        start: "2025-03-10T00:00:00Z".to_string(),
        end: "2025-03-11T00:00:00Z".to_string(),
        reason: "duplicate file".to_string(),
        execution_name: "cli-exec".to_string(),
        continue_from: None,
        max_invocations: 5,
    }
}

#[test]
fn test_rollback_rewrites_snapshot_and_results() {
    let dir = tempfile::tempdir().unwrap();
    let provider_id = ProviderId::new();
    let path = write_snapshot(dir.path(), provider_id);

    let code = run_rollback(&rollback_args(dir.path(), path.clone())).unwrap();
    assert_eq!(code, 0);
    assert!(dir.path().join("results/cli-exec/rollback-results.json").exists());

    let store = snapshot::open(&path).unwrap();
    let aggregate = ProviderAggregate::load(
        &store,
        &CompactCode::new("aslp").unwrap(),
        &provider_id,
        UpdateTierBound::ALL,
        Consistency::Strong,
    )
    .unwrap();
    assert!(aggregate.updates().is_empty());
    assert_eq!(
        aggregate.licenses()[0].date_of_expiration,
        NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()
    );
}

#[test]
fn test_rejected_window_exits_with_failure_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), ProviderId::new());
    let before = std::fs::read(&path).unwrap();
    let mut args = rollback_args(dir.path(), path.clone());
    args.end = "2025-04-11T00:00:00Z".to_string();

    assert_eq!(run_rollback(&args).unwrap(), 2);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn test_inspect_unknown_provider_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_snapshot(dir.path(), ProviderId::new());
    let result = run_inspect(&InspectArgs {
        snapshot: path,
        compact: "aslp".to_string(),
        provider_id: ProviderId::new().to_string(),
        max_tier: None,
    });
    assert!(result.is_err());
}

#[test]
fn test_inspect_rejects_bad_tier() {
    let dir = tempfile::tempdir().unwrap();
    let provider_id = ProviderId::new();
    let path = write_snapshot(dir.path(), provider_id);
    let result = run_inspect(&InspectArgs {
        snapshot: path,
        compact: "aslp".to_string(),
        provider_id: provider_id.to_string(),
        max_tier: Some(7),
    });
    assert!(result.is_err());
}
