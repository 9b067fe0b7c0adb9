//! Encumbrance engine behaviour against the in-memory store.

mod common;

use common::{date, Harness};
use compact_state::events::{
    LICENSE_ENCUMBRANCE, LICENSE_ENCUMBRANCE_LIFTED, PRIVILEGE_ENCUMBRANCE_LIFTED,
};
use compact_state::model::{EncumberedStatus, PrivilegeEncumberedStatus};
use compact_state::{EncumbranceEngine, EngineError, UpdateType};
use compact_store::RecordStore;

fn license_updates(h: &Harness, update_type: UpdateType) -> usize {
    let aggregate = h.aggregate();
    let subject = h.license_target().update_subject();
    aggregate
        .updates_for(&subject)
        .filter(|u| u.update_type == update_type)
        .count()
}

#[test]
fn test_encumber_license_escalates_provider_and_privileges() {
    let h = Harness::new();
    let action = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();

    assert!(h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);
    assert_eq!(license_updates(&h, UpdateType::Encumbrance), 1);
    for privilege in ["ne", "ky"] {
        assert_eq!(
            h.privilege(privilege).encumbered_status,
            PrivilegeEncumberedStatus::LicenseEncumbered
        );
    }
    let aggregate = h.aggregate();
    assert_eq!(aggregate.adverse_actions().len(), 1);
    assert_eq!(aggregate.adverse_actions()[0], action);

    let events = h.bus.of_type(LICENSE_ENCUMBRANCE);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].detail["jurisdiction"], "oh");
    assert_eq!(events[0].detail["adverseActionId"], action.adverse_action_id.to_string());
}

#[test]
fn test_second_encumbrance_writes_no_duplicate_history() {
    let h = Harness::new();
    let engine = h.encumbrances();
    engine.encumber_license(h.encumber_request("oh")).unwrap();
    let updates_before = h.aggregate().updates().len();
    engine.encumber_license(h.encumber_request("oh")).unwrap();

    assert_eq!(h.aggregate().adverse_actions().len(), 2);
    assert_eq!(license_updates(&h, UpdateType::Encumbrance), 1);
    assert_eq!(h.aggregate().updates().len(), updates_before);
    assert!(h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);
}

#[test]
fn test_encumber_missing_license_is_not_found() {
    let h = Harness::new();
    let err = h
        .encumbrances()
        .encumber_license(h.encumber_request("ky"))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(h.aggregate().adverse_actions().is_empty());
}

#[test]
fn test_encumber_requires_submitting_user() {
    let h = Harness::new();
    let mut request = h.encumber_request("oh");
    request.submitting_user = "  ".to_string();
    let err = h.encumbrances().encumber_license(request).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[test]
fn test_lift_last_action_releases_everything() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let action = engine.encumber_license(h.encumber_request("oh")).unwrap();
    let outcome = engine
        .lift_license_encumbrance(h.lift_request("oh", action.adverse_action_id))
        .unwrap();

    assert!(outcome.target_released);
    assert!(outcome.provider_released);
    assert_eq!(outcome.privileges_released.len(), 2);
    assert!(!h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Unencumbered);
    for privilege in ["ne", "ky"] {
        assert_eq!(
            h.privilege(privilege).encumbered_status,
            PrivilegeEncumberedStatus::Unencumbered
        );
    }
    let agg = h.aggregate();
    let lifted = &agg.adverse_actions()[0];
    assert_eq!(lifted.effective_lift_date, Some(date(2025, 4, 1)));
    assert_eq!(lifted.lifting_user.as_deref(), Some("board-admin"));
    assert_eq!(license_updates(&h, UpdateType::LiftingEncumbrance), 1);
    assert_eq!(h.bus.of_type(LICENSE_ENCUMBRANCE_LIFTED).len(), 1);
    let mut announced: Vec<String> = h
        .bus
        .of_type(PRIVILEGE_ENCUMBRANCE_LIFTED)
        .iter()
        .map(|e| e.detail["jurisdiction"].as_str().unwrap().to_string())
        .collect();
    announced.sort();
    assert_eq!(announced, vec!["ky", "ne"]);
}

#[test]
fn test_lift_with_remaining_action_keeps_license_encumbered() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let first = engine.encumber_license(h.encumber_request("oh")).unwrap();
    engine.encumber_license(h.encumber_request("oh")).unwrap();
    let outcome = engine
        .lift_license_encumbrance(h.lift_request("oh", first.adverse_action_id))
        .unwrap();

    assert!(!outcome.target_released);
    assert!(!outcome.provider_released);
    assert!(outcome.privileges_released.is_empty());
    assert!(h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);
    assert_eq!(license_updates(&h, UpdateType::LiftingEncumbrance), 0);
    assert!(h.bus.of_type(LICENSE_ENCUMBRANCE_LIFTED).is_empty());
}

#[test]
fn test_lift_unknown_action_is_not_found() {
    let h = Harness::new();
    let err = h
        .encumbrances()
        .lift_license_encumbrance(h.lift_request("oh", compact_core::AdverseActionId::new()))
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[test]
fn test_double_lift_is_invalid_request() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let action = engine.encumber_license(h.encumber_request("oh")).unwrap();
    engine
        .lift_license_encumbrance(h.lift_request("oh", action.adverse_action_id))
        .unwrap();
    let err = engine
        .lift_license_encumbrance(h.lift_request("oh", action.adverse_action_id))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[test]
fn test_lift_before_start_date_is_invalid() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let action = engine.encumber_license(h.encumber_request("oh")).unwrap();
    let mut request = h.lift_request("oh", action.adverse_action_id);
    request.effective_lift_date = date(2025, 1, 1);
    let err = engine.lift_license_encumbrance(request).unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[test]
fn test_stale_lift_loses_the_race() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let action = engine.encumber_license(h.encumber_request("oh")).unwrap();
    let stale = h.aggregate();
    engine
        .lift_license_encumbrance(h.lift_request("oh", action.adverse_action_id))
        .unwrap();

    let stale_action = &stale.adverse_actions()[0];
    let late = compact_state::txn::lift_adverse_action(
        stale_action,
        date(2025, 5, 1),
        "second-admin",
        compact_core::Timestamp::parse("2025-05-01T00:00:00Z").unwrap(),
    );
    let err = h.store.transact_write(vec![late]).unwrap_err();
    assert!(err.is_condition_failure());
    let agg = h.aggregate();
    let lifted = &agg.adverse_actions()[0];
    assert_eq!(lifted.lifting_user.as_deref(), Some("board-admin"));
}

#[test]
fn test_direct_privilege_action_survives_license_lift() {
    let h = Harness::new();
    let engine = h.encumbrances();
    let on_privilege = engine.encumber_privilege(h.encumber_request("ne")).unwrap();
    let on_license = engine.encumber_license(h.encumber_request("oh")).unwrap();

    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::Encumbered
    );
    assert_eq!(
        h.privilege("ky").encumbered_status,
        PrivilegeEncumberedStatus::LicenseEncumbered
    );

    let outcome = engine
        .lift_license_encumbrance(h.lift_request("oh", on_license.adverse_action_id))
        .unwrap();
    assert_eq!(outcome.privileges_released, vec![common::j("ky")]);
    assert!(!outcome.provider_released);
    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::Encumbered
    );
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);

    let outcome = engine
        .lift_privilege_encumbrance(h.lift_request("ne", on_privilege.adverse_action_id))
        .unwrap();
    assert!(outcome.provider_released);
    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::Unencumbered
    );
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Unencumbered);
}

#[test]
fn test_privilege_lift_under_encumbered_license_is_license_encumbered() {
    let h = Harness::new();
    let engine = h.encumbrances();
    engine.encumber_license(h.encumber_request("oh")).unwrap();
    let on_privilege = engine.encumber_privilege(h.encumber_request("ne")).unwrap();
    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::Encumbered
    );

    let outcome = engine
        .lift_privilege_encumbrance(h.lift_request("ne", on_privilege.adverse_action_id))
        .unwrap();
    assert!(outcome.target_released);
    assert!(!outcome.provider_released);
    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::LicenseEncumbered
    );
}

#[test]
fn test_direct_privilege_encumbrance_writes_one_action_and_no_privilege_history() {
    let h = Harness::new();
    h.encumbrances()
        .encumber_privilege(h.encumber_request("ne"))
        .unwrap();
    let aggregate = h.aggregate();
    assert_eq!(aggregate.adverse_actions().len(), 1);
    assert_eq!(
        aggregate
            .updates_for(&h.privilege_target("ne").update_subject())
            .count(),
        0
    );
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);
    assert!(!h.license().is_encumbered());
}

#[test]
fn test_cascade_is_idempotent() {
    let h = Harness::new();
    let engine = h.encumbrances();
    engine.encumber_license(h.encumber_request("oh")).unwrap();
    let again = engine
        .encumber_privileges_for_license(
            &h.compact,
            &h.provider_id,
            &common::j("oh"),
            &common::slp(),
            date(2025, 2, 15),
        )
        .unwrap();
    assert!(again.is_empty());
    let lifted = engine
        .lift_license_encumbrance_from_privileges(
            &h.compact,
            &h.provider_id,
            &common::j("oh"),
            &common::slp(),
            date(2025, 4, 1),
        )
        .unwrap();
    assert!(lifted.is_empty(), "license is still encumbered");
}

#[test]
fn test_publish_failure_surfaces_after_commit() {
    let h = Harness::new();
    h.bus.fail_next_publish("bus unavailable");
    let err = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Event(_)));
    assert!(h.license().is_encumbered());
}

#[test]
fn test_transient_store_failure_writes_nothing() {
    let h = Harness::new();
    h.store.fail_next_transaction("throttled");
    let err = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreTransient(_)));
    assert!(err.is_retryable());
    assert!(!h.license().is_encumbered());
    assert!(h.aggregate().adverse_actions().is_empty());
}

#[test]
fn test_encumbrance_racing_last_lift_conflicts() {
    let h = Harness::new();
    let first = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();

    let lifter = h.encumbrances();
    let lift = h.lift_request("oh", first.adverse_action_id);
    let racing = EncumbranceEngine::new(h.interleaved(move || {
        let outcome = lifter.lift_license_encumbrance(lift).unwrap();
        assert!(outcome.provider_released);
    }));
    let err = racing
        .encumber_license(h.encumber_request("oh"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)), "{err}");

    assert_eq!(h.unlifted(), 0);
    assert!(!h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Unencumbered);

    h.encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();
    assert_eq!(h.unlifted(), 1);
    assert!(h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);
}

#[test]
fn test_last_lift_racing_new_encumbrance_conflicts() {
    let h = Harness::new();
    let first = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();

    let encumberer = h.encumbrances();
    let second = h.encumber_request("oh");
    let racing = EncumbranceEngine::new(h.interleaved(move || {
        encumberer.encumber_license(second).unwrap();
    }));
    let err = racing
        .lift_license_encumbrance(h.lift_request("oh", first.adverse_action_id))
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)), "{err}");

    assert_eq!(h.unlifted(), 2);
    assert!(h.license().is_encumbered());
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Encumbered);

    let outcome = h
        .encumbrances()
        .lift_license_encumbrance(h.lift_request("oh", first.adverse_action_id))
        .unwrap();
    assert!(!outcome.target_released);
    assert!(h.license().is_encumbered());
}

#[test]
fn test_privilege_encumbrance_racing_license_release_conflicts() {
    let h = Harness::new();
    let on_license = h
        .encumbrances()
        .encumber_license(h.encumber_request("oh"))
        .unwrap();

    let lifter = h.encumbrances();
    let lift = h.lift_request("oh", on_license.adverse_action_id);
    let racing = EncumbranceEngine::new(h.interleaved(move || {
        lifter.lift_license_encumbrance(lift).unwrap();
    }));
    let err = racing
        .encumber_privilege(h.encumber_request("ne"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)), "{err}");
    assert_eq!(h.unlifted(), 0);
    assert_eq!(h.provider().encumbered_status, EncumberedStatus::Unencumbered);
    assert_eq!(
        h.privilege("ne").encumbered_status,
        PrivilegeEncumberedStatus::Unencumbered
    );
}
