//! # Encumbrance Engine
//!
//! Imposes and lifts adverse actions while keeping three statuses in step:
//!
//! - a license or privilege is `encumbered` iff it has an unlifted
//!   adverse action of its own;
//! - a privilege whose home license is encumbered, and which has no
//!   action of its own, is `licenseEncumbered`;
//! - the provider is `encumbered` iff any license or privilege is.
//!
//! Each operation reads the provider aggregate with strong consistency,
//! computes the delta, and commits it as one conditional transaction.
//! Provider status is only written on an actual transition.
//!
//! ## License Cascade
//!
//! Privileges follow their home license in a second step, after the
//! license transaction commits and its event is published:
//!
//! ```text
//! encumber_license ──▶ license.encumbrance ──▶ encumber_privileges_for_license
//! lift (last action) ──▶ license.encumbranceLifted ──▶ lift_license_encumbrance_from_privileges
//!                                                          └──▶ privilege.encumbranceLifted (per jurisdiction)
//! ```
//!
//! Both cascade steps re-read state and are idempotent, so an event
//! listener may re-drive them.

use chrono::NaiveDate;
use tracing::{debug, info};

use compact_core::{AdverseActionId, CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::{Condition, TransactItem, UpdateExpression};

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::events::{
    LicenseEncumbranceDetail, PrivilegeEncumbranceLiftedDetail, LICENSE_ENCUMBRANCE,
    LICENSE_ENCUMBRANCE_LIFTED, PRIVILEGE_ENCUMBRANCE_LIFTED,
};
use crate::model::{
    AdverseActionRecord, EncumberedStatus, PrivilegeEncumberedStatus, StoredRecord, UpdateDraft,
    UpdateType,
};
use crate::target::{RecordTarget, StatusBearing, TargetRecord};
use crate::txn::{self, TransactionPlan};

const ENCUMBERED_STATUS: &str = "encumberedStatus";

// ─── Requests ────────────────────────────────────────────────────────

/// A new adverse action against a license or privilege.
#[derive(Debug, Clone, PartialEq)]
pub struct EncumbranceRequest {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub effective_start_date: NaiveDate,
    pub encumbrance_type: String,
    pub clinical_privilege_action_category: String,
    pub submitting_user: String,
}

/// Lift of an existing adverse action.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftRequest {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub adverse_action_id: AdverseActionId,
    pub effective_lift_date: NaiveDate,
    pub lifting_user: String,
}

/// What a lift changed.
#[derive(Debug, Clone, PartialEq)]
pub struct LiftOutcome {
    pub adverse_action_id: AdverseActionId,
    /// The target's own status left `encumbered`.
    pub target_released: bool,
    /// The provider is unencumbered after the lift.
    pub provider_released: bool,
    /// Jurisdictions whose privileges were released by the license cascade.
    pub privileges_released: Vec<Jurisdiction>,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Creates and lifts adverse actions.
#[derive(Debug, Clone)]
pub struct EncumbranceEngine {
    ctx: EngineContext,
}

impl EncumbranceEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Encumber a license, then its privileges.
    ///
    /// Fails with [`EngineError::NotFound`] if the license is absent.
    pub fn encumber_license(
        &self,
        request: EncumbranceRequest,
    ) -> Result<AdverseActionRecord, EngineError> {
        let target = RecordTarget::license(
            request.jurisdiction.clone(),
            request.license_type_abbr.clone(),
        );
        self.encumber(target, request)
    }

    /// Encumber a privilege directly.
    pub fn encumber_privilege(
        &self,
        request: EncumbranceRequest,
    ) -> Result<AdverseActionRecord, EngineError> {
        let target = RecordTarget::privilege(
            request.jurisdiction.clone(),
            request.license_type_abbr.clone(),
        );
        self.encumber(target, request)
    }

    /// Lift an adverse action on a license, cascading to its privileges
    /// when it was the last one.
    pub fn lift_license_encumbrance(&self, request: LiftRequest) -> Result<LiftOutcome, EngineError> {
        let target = RecordTarget::license(
            request.jurisdiction.clone(),
            request.license_type_abbr.clone(),
        );
        self.lift(target, request)
    }

    /// Lift an adverse action on a privilege.
    pub fn lift_privilege_encumbrance(
        &self,
        request: LiftRequest,
    ) -> Result<LiftOutcome, EngineError> {
        let target = RecordTarget::privilege(
            request.jurisdiction.clone(),
            request.license_type_abbr.clone(),
        );
        self.lift(target, request)
    }

    /// Impose an adverse action on `target`.
    pub fn encumber(
        &self,
        target: RecordTarget,
        request: EncumbranceRequest,
    ) -> Result<AdverseActionRecord, EngineError> {
        require_non_empty("submittingUser", &request.submitting_user)?;
        require_non_empty("encumbranceType", &request.encumbrance_type)?;
        let now = self.ctx.clock.now();
        let aggregate = self.ctx.load_state(&request.compact, &request.provider_id)?;
        let resolved = aggregate.target(&target).ok_or_else(|| {
            EngineError::NotFound(format!("{target} for provider {}", request.provider_id))
        })?;
        if aggregate.provider().is_none() {
            return Err(EngineError::Internal(format!(
                "provider {} has a {target} but no provider record",
                request.provider_id
            )));
        }

        let action = AdverseActionRecord {
            adverse_action_id: AdverseActionId::new(),
            provider_id: request.provider_id,
            compact: request.compact.clone(),
            action_against: target.kind(),
            jurisdiction: request.jurisdiction.clone(),
            license_type_abbr: request.license_type_abbr.clone(),
            encumbrance_type: request.encumbrance_type,
            clinical_privilege_action_category: request.clinical_privilege_action_category,
            effective_start_date: request.effective_start_date,
            creation_date: now,
            submitting_user: request.submitting_user,
            effective_lift_date: None,
            lifting_user: None,
            date_of_update: now,
        };

        let mut plan = TransactionPlan::new();
        match resolved {
            TargetRecord::License { record, item } if !record.is_encumbered() => {
                let draft = UpdateDraft::new(target.update_subject(), UpdateType::Encumbrance, item)
                    .set(ENCUMBERED_STATUS, EncumberedStatus::Encumbered.as_str())
                    .effective(Timestamp::start_of_day(request.effective_start_date));
                plan.push_all(txn::recorded_change(&aggregate, item, draft, now)?);
            }
            // A direct privilege encumbrance flips status without a privilege
            // history entry; rollback only replays license history.
            TargetRecord::Privilege { record, item } if !record.is_encumbered() => {
                plan.push(txn::unrecorded_change(
                    item,
                    UpdateExpression::new().set(
                        ENCUMBERED_STATUS,
                        PrivilegeEncumberedStatus::Encumbered.as_str(),
                    ),
                    now,
                )?);
            }
            // Already encumbered: the status stays, but a lift racing this
            // call must not release it underneath the new action.
            other => {
                debug!(target = %target, "already encumbered, no status change");
                plan.push(txn::reaffirm_status(
                    other.item(),
                    EncumberedStatus::Encumbered.as_str(),
                    now,
                )?);
            }
        }
        plan.push(txn::create(&action)?);
        match txn::provider_status(&aggregate, EncumberedStatus::Encumbered, now) {
            Some(item) => plan.push(item),
            None => plan.push_all(txn::reaffirm_provider_status(
                &aggregate,
                EncumberedStatus::Encumbered,
                now,
            )?),
        }
        self.ctx.commit(plan, "encumber", None)?;
        info!(
            compact = %action.compact,
            provider_id = %action.provider_id,
            target = %target,
            adverse_action_id = %action.adverse_action_id,
            "adverse action recorded"
        );

        if let RecordTarget::License { .. } = target {
            self.ctx.events.publish(
                LICENSE_ENCUMBRANCE,
                &LicenseEncumbranceDetail {
                    compact: action.compact.clone(),
                    provider_id: action.provider_id,
                    jurisdiction: action.jurisdiction.clone(),
                    license_type_abbreviation: action.license_type_abbr.clone(),
                    adverse_action_id: action.adverse_action_id,
                    effective_date: action.effective_start_date,
                },
            )?;
            self.encumber_privileges_for_license(
                &action.compact,
                &action.provider_id,
                &action.jurisdiction,
                &action.license_type_abbr,
                action.effective_start_date,
            )?;
        }
        Ok(action)
    }

    /// Lift one adverse action on `target`.
    pub fn lift(&self, target: RecordTarget, request: LiftRequest) -> Result<LiftOutcome, EngineError> {
        require_non_empty("liftingUser", &request.lifting_user)?;
        let now = self.ctx.clock.now();
        let id = request.adverse_action_id;
        let aggregate = self.ctx.load_state(&request.compact, &request.provider_id)?;
        let action = aggregate
            .adverse_action(&target, &id)
            .ok_or_else(|| EngineError::NotFound(format!("adverse action {id} on {target}")))?;
        if !action.is_unlifted() {
            return Err(EngineError::InvalidRequest(format!(
                "adverse action {id} is already lifted"
            )));
        }
        if request.effective_lift_date < action.effective_start_date {
            return Err(EngineError::InvalidRequest(format!(
                "lift date {} precedes start date {}",
                request.effective_lift_date, action.effective_start_date
            )));
        }
        let resolved = aggregate.target(&target).ok_or_else(|| {
            EngineError::Internal(format!("adverse action {id} references missing {target}"))
        })?;

        let mut plan = TransactionPlan::new();
        plan.push(txn::lift_adverse_action(
            action,
            request.effective_lift_date,
            &request.lifting_user,
            now,
        ));

        let others = aggregate.unlifted_adverse_actions_excluding(&id);
        let target_released = aggregate
            .unlifted_adverse_actions_for(&target, Some(&id))
            .is_empty();
        if target_released && resolved.is_encumbered() {
            let to = match resolved {
                TargetRecord::License { .. } => EncumberedStatus::Unencumbered.as_str(),
                TargetRecord::Privilege { record, .. } => {
                    let home_encumbered = aggregate
                        .home_license(record)
                        .is_some_and(|license| record.follows(license) && license.is_encumbered());
                    if home_encumbered {
                        PrivilegeEncumberedStatus::LicenseEncumbered.as_str()
                    } else {
                        PrivilegeEncumberedStatus::Unencumbered.as_str()
                    }
                }
            };
            let draft = UpdateDraft::new(
                target.update_subject(),
                UpdateType::LiftingEncumbrance,
                resolved.item(),
            )
            .set(ENCUMBERED_STATUS, to)
            .effective(Timestamp::start_of_day(request.effective_lift_date));
            plan.push_all(txn::recorded_change(&aggregate, resolved.item(), draft, now)?);
        }
        // Both "target stays encumbered" and "provider stays encumbered"
        // rest on these actions remaining unlifted until commit.
        plan.push_all(others.iter().map(|other| txn::still_unlifted(other)));

        let provider_released = others.is_empty() && !aggregate.encumbered_elsewhere(&target);
        if provider_released {
            if let Some(item) =
                txn::provider_status(&aggregate, EncumberedStatus::Unencumbered, now)
            {
                plan.push(item);
            }
        }
        self.ctx.commit(plan, "lift encumbrance", None)?;
        info!(
            compact = %request.compact,
            provider_id = %request.provider_id,
            target = %target,
            adverse_action_id = %id,
            target_released,
            provider_released,
            "adverse action lifted"
        );

        let mut privileges_released = Vec::new();
        if target_released {
            if let RecordTarget::License { .. } = target {
                self.ctx.events.publish(
                    LICENSE_ENCUMBRANCE_LIFTED,
                    &LicenseEncumbranceDetail {
                        compact: request.compact.clone(),
                        provider_id: request.provider_id,
                        jurisdiction: request.jurisdiction.clone(),
                        license_type_abbreviation: request.license_type_abbr.clone(),
                        adverse_action_id: id,
                        effective_date: request.effective_lift_date,
                    },
                )?;
                privileges_released = self.lift_license_encumbrance_from_privileges(
                    &request.compact,
                    &request.provider_id,
                    &request.jurisdiction,
                    &request.license_type_abbr,
                    request.effective_lift_date,
                )?;
            }
        }
        Ok(LiftOutcome {
            adverse_action_id: id,
            target_released,
            provider_released,
            privileges_released,
        })
    }

    /// Mark every unencumbered privilege following the license as
    /// `licenseEncumbered`. Privileges with their own action are left as
    /// they are. Returns the jurisdictions changed.
    pub fn encumber_privileges_for_license(
        &self,
        compact: &CompactCode,
        provider_id: &ProviderId,
        jurisdiction: &Jurisdiction,
        license_type_abbr: &LicenseTypeAbbr,
        effective_date: NaiveDate,
    ) -> Result<Vec<Jurisdiction>, EngineError> {
        self.cascade(
            compact,
            provider_id,
            RecordTarget::license(jurisdiction.clone(), license_type_abbr.clone()),
            Cascade {
                license_status: EncumberedStatus::Encumbered,
                from: PrivilegeEncumberedStatus::Unencumbered,
                to: PrivilegeEncumberedStatus::LicenseEncumbered,
                update_type: UpdateType::LicenseEncumbrance,
                effective_date,
            },
        )
    }

    /// Release every `licenseEncumbered` privilege following the license
    /// once the license itself is unencumbered, and announce each release.
    pub fn lift_license_encumbrance_from_privileges(
        &self,
        compact: &CompactCode,
        provider_id: &ProviderId,
        jurisdiction: &Jurisdiction,
        license_type_abbr: &LicenseTypeAbbr,
        effective_date: NaiveDate,
    ) -> Result<Vec<Jurisdiction>, EngineError> {
        let released = self.cascade(
            compact,
            provider_id,
            RecordTarget::license(jurisdiction.clone(), license_type_abbr.clone()),
            Cascade {
                license_status: EncumberedStatus::Unencumbered,
                from: PrivilegeEncumberedStatus::LicenseEncumbered,
                to: PrivilegeEncumberedStatus::Unencumbered,
                update_type: UpdateType::LicenseEncumbranceLifted,
                effective_date,
            },
        )?;
        for privilege_jurisdiction in &released {
            self.ctx.events.publish(
                PRIVILEGE_ENCUMBRANCE_LIFTED,
                &PrivilegeEncumbranceLiftedDetail {
                    compact: compact.clone(),
                    provider_id: *provider_id,
                    jurisdiction: privilege_jurisdiction.clone(),
                    license_type_abbreviation: license_type_abbr.clone(),
                    effective_date,
                },
            )?;
        }
        Ok(released)
    }

    fn cascade(
        &self,
        compact: &CompactCode,
        provider_id: &ProviderId,
        license_target: RecordTarget,
        cascade: Cascade,
    ) -> Result<Vec<Jurisdiction>, EngineError> {
        let now = self.ctx.clock.now();
        let aggregate = self.ctx.load_state(compact, provider_id)?;
        let license = aggregate
            .license(license_target.jurisdiction(), license_target.license_type_abbr())
            .ok_or_else(|| EngineError::NotFound(format!("{license_target} for provider {provider_id}")))?;
        if license.encumbered_status != cascade.license_status {
            debug!(
                provider_id = %provider_id,
                license = %license_target,
                "license status moved on, privilege cascade skipped"
            );
            return Ok(Vec::new());
        }

        let mut plan = TransactionPlan::new();
        let mut changed = Vec::new();
        for privilege in aggregate
            .privileges_following(license)
            .filter(|p| p.encumbered_status == cascade.from)
        {
            let target =
                RecordTarget::privilege(privilege.jurisdiction.clone(), privilege.license_type_abbr.clone());
            let item = aggregate.item(&target.sort_key(compact)).ok_or_else(|| {
                EngineError::Internal(format!("{target} decoded without a raw item"))
            })?;
            let draft = UpdateDraft::new(target.update_subject(), cascade.update_type, item)
                .set(ENCUMBERED_STATUS, cascade.to.as_str())
                .effective(Timestamp::start_of_day(cascade.effective_date));
            plan.push_all(txn::recorded_change(&aggregate, item, draft, now)?);
            changed.push(privilege.jurisdiction.clone());
        }
        if changed.is_empty() {
            return Ok(changed);
        }
        plan.push(TransactItem::ConditionCheck {
            key: license.key(),
            condition: Condition::item_exists()
                .and(Condition::equals(ENCUMBERED_STATUS, cascade.license_status.as_str())),
        });
        self.ctx.commit(plan, "privilege cascade", None)?;
        info!(
            compact = %compact,
            provider_id = %provider_id,
            license = %license_target,
            privileges = changed.len(),
            to = cascade.to.as_str(),
            "privileges follow home license"
        );
        Ok(changed)
    }
}

struct Cascade {
    license_status: EncumberedStatus,
    from: PrivilegeEncumberedStatus,
    to: PrivilegeEncumberedStatus,
    update_type: UpdateType,
    effective_date: NaiveDate,
}

fn require_non_empty(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
