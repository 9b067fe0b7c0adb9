mod common;

use common::{date, Harness};
use compact_state::model::JurisdictionLicenseStatus;
use compact_state::{IngestOutcome, UpdateSubject, UpdateType};

#[test]
fn test_first_upload_creates_provider_and_license() {
    let h = Harness::new();
    let provider = h.provider();
    assert_eq!(provider.given_name, "Ada");
    assert_eq!(provider.license_jurisdiction.as_str(), "oh");
    let license = h.license();
    assert_eq!(license.first_upload_date, license.date_of_update);
    assert!(h.aggregate().updates().is_empty());
}

#[test]
fn test_later_expiration_is_a_renewal() {
    let h = Harness::new();
    let first_upload = h.license().first_upload_date;
    let outcome = h.upload("oh", date(2029, 1, 1), JurisdictionLicenseStatus::Active);
    assert_eq!(outcome, IngestOutcome::Updated(UpdateType::Renewal));

    let license = h.license();
    assert_eq!(license.date_of_expiration, date(2029, 1, 1));
    assert_eq!(license.first_upload_date, first_upload);

    let aggregate = h.aggregate();
    let updates: Vec<_> = aggregate.updates_for(&h.license_target().update_subject()).collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].previous["dateOfExpiration"], "2027-01-01");
    assert_eq!(updates[0].updated_values["dateOfExpiration"], "2029-01-01");
    assert!(updates[0].update_type.is_upload_related());
}

#[test]
fn test_deactivation_wins_over_renewal() {
    let h = Harness::new();
    let outcome = h.upload("oh", date(2029, 1, 1), JurisdictionLicenseStatus::Inactive);
    assert_eq!(outcome, IngestOutcome::Updated(UpdateType::Deactivation));
}

#[test]
fn test_identical_upload_writes_nothing() {
    let h = Harness::new();
    let before = h.aggregate().items().clone();
    let outcome = h.upload("oh", date(2027, 1, 1), JurisdictionLicenseStatus::Active);
    assert_eq!(outcome, IngestOutcome::Unchanged);
    assert_eq!(h.aggregate().items(), &before);
}

#[test]
fn test_upload_keeps_encumbrance_state() {
    let h = Harness::new();
    h.encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();
    let outcome = h.upload("oh", date(2026, 6, 1), JurisdictionLicenseStatus::Active);
    assert_eq!(outcome, IngestOutcome::Updated(UpdateType::LicenseUploadUpdateOther));
    assert!(h.license().is_encumbered());
}

#[test]
fn test_second_jurisdiction_license_is_created_under_same_provider() {
    let h = Harness::new();
    let outcome = h.upload("ky", date(2027, 1, 1), JurisdictionLicenseStatus::Active);
    assert_eq!(outcome, IngestOutcome::Created);
    assert_eq!(h.aggregate().licenses().len(), 2);
    assert_eq!(
        h.aggregate()
            .updates_for(&UpdateSubject::Provider)
            .count(),
        0
    );
}

#[test]
fn test_name_change_alone_updates_provider() {
    let h = Harness::new();
    let mut row = h.upload_row("oh", date(2027, 1, 1), JurisdictionLicenseStatus::Active);
    row.family_name = "King".to_string();
    let license_before = h.license();

    assert_eq!(h.ingest(row), IngestOutcome::ProviderUpdated);
    assert_eq!(h.provider().family_name, "King");
    assert_eq!(h.license(), license_before);
    let aggregate = h.aggregate();
    let history: Vec<_> = aggregate.updates_for(&UpdateSubject::Provider).collect();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].update_type, UpdateType::LicenseUploadUpdateOther);
}
