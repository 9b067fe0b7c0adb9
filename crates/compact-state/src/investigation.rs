//! # Investigation Engine
//!
//! Per target the investigation marker cycles `none → underInvestigation
//! → none`. Several investigations may be open at once; the marker is set
//! by every opening and cleared only when the last open one closes. Each
//! clearing writes one `closingInvestigation` history entry.

use chrono::NaiveDate;
use tracing::info;

use compact_core::{AdverseActionId, CompactCode, InvestigationId, ProviderId, Timestamp};

use crate::context::EngineContext;
use crate::encumbrance::{EncumbranceEngine, EncumbranceRequest};
use crate::error::EngineError;
use crate::model::{InvestigationRecord, InvestigationStatus, StoredRecord, UpdateDraft, UpdateType};
use crate::target::{RecordTarget, StatusBearing};
use crate::txn::{self, TransactionPlan};

const INVESTIGATION_STATUS: &str = "investigationStatus";

/// Open an investigation against a license or privilege.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestigationRequest {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub target: RecordTarget,
    pub submitting_user: String,
}

/// Close an open investigation.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseInvestigationRequest {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub target: RecordTarget,
    pub investigation_id: InvestigationId,
    pub closing_user: String,
    /// Defaults to now.
    pub close_date: Option<Timestamp>,
}

/// The adverse action to impose when an investigation closes with one.
#[derive(Debug, Clone, PartialEq)]
pub struct EncumbranceTerms {
    pub effective_start_date: NaiveDate,
    pub encumbrance_type: String,
    pub clinical_privilege_action_category: String,
}

/// What a close changed.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOutcome {
    pub investigation_id: InvestigationId,
    /// The target's investigation marker was removed.
    pub status_cleared: bool,
    pub resulting_encumbrance_id: Option<AdverseActionId>,
}

/// Opens and closes investigations.
#[derive(Debug, Clone)]
pub struct InvestigationEngine {
    ctx: EngineContext,
    encumbrances: EncumbranceEngine,
}

impl InvestigationEngine {
    pub fn new(ctx: EngineContext) -> Self {
        let encumbrances = EncumbranceEngine::new(ctx.clone());
        Self { ctx, encumbrances }
    }

    /// Open an investigation and mark the target.
    ///
    /// Fails with [`EngineError::NotFound`] if the target is absent.
    pub fn create_investigation(
        &self,
        request: InvestigationRequest,
    ) -> Result<InvestigationRecord, EngineError> {
        if request.submitting_user.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "submittingUser must not be empty".to_string(),
            ));
        }
        let now = self.ctx.clock.now();
        let target = request.target;
        let aggregate = self.ctx.load_state(&request.compact, &request.provider_id)?;
        let resolved = aggregate.target(&target).ok_or_else(|| {
            EngineError::NotFound(format!("{target} for provider {}", request.provider_id))
        })?;

        let record = InvestigationRecord {
            investigation_id: InvestigationId::new(),
            provider_id: request.provider_id,
            compact: request.compact.clone(),
            investigation_against: target.kind(),
            jurisdiction: target.jurisdiction().clone(),
            license_type_abbr: target.license_type_abbr().clone(),
            submitting_user: request.submitting_user,
            creation_date: now,
            close_date: None,
            closing_user: None,
            resulting_encumbrance_id: None,
            date_of_update: now,
        };
        let draft = UpdateDraft::new(target.update_subject(), UpdateType::Investigation, resolved.item())
            .set(
                INVESTIGATION_STATUS,
                InvestigationStatus::UnderInvestigation.as_str(),
            );

        let mut plan = TransactionPlan::new();
        plan.push(txn::create(&record)?);
        plan.push_all(txn::recorded_change(&aggregate, resolved.item(), draft, now)?);
        self.ctx.commit(plan, "create investigation", None)?;
        info!(
            compact = %record.compact,
            provider_id = %record.provider_id,
            target = %target,
            investigation_id = %record.investigation_id,
            "investigation opened"
        );
        Ok(record)
    }

    /// Close an investigation, clearing the target's marker if it was the
    /// last open one.
    ///
    /// Fails with [`EngineError::NotFound`] if the investigation is absent
    /// or already closed, including when a concurrent close wins the race.
    pub fn close_investigation(
        &self,
        request: CloseInvestigationRequest,
    ) -> Result<CloseOutcome, EngineError> {
        self.close(request, None)
    }

    /// Impose an adverse action on the investigated target, then close the
    /// investigation recording the action's id.
    pub fn close_investigation_with_encumbrance(
        &self,
        request: CloseInvestigationRequest,
        terms: EncumbranceTerms,
    ) -> Result<CloseOutcome, EngineError> {
        let aggregate = self.ctx.load_state(&request.compact, &request.provider_id)?;
        if !aggregate
            .investigation(&request.target, &request.investigation_id)
            .is_some_and(InvestigationRecord::is_open)
        {
            return Err(EngineError::NotFound(format!(
                "open investigation {} on {}",
                request.investigation_id, request.target
            )));
        }
        let action = self.encumbrances.encumber(
            request.target.clone(),
            EncumbranceRequest {
                compact: request.compact.clone(),
                provider_id: request.provider_id,
                jurisdiction: request.target.jurisdiction().clone(),
                license_type_abbr: request.target.license_type_abbr().clone(),
                effective_start_date: terms.effective_start_date,
                encumbrance_type: terms.encumbrance_type,
                clinical_privilege_action_category: terms.clinical_privilege_action_category,
                submitting_user: request.closing_user.clone(),
            },
        )?;
        self.close(request, Some(action.adverse_action_id))
    }

    fn close(
        &self,
        request: CloseInvestigationRequest,
        resulting_encumbrance_id: Option<AdverseActionId>,
    ) -> Result<CloseOutcome, EngineError> {
        if request.closing_user.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "closingUser must not be empty".to_string(),
            ));
        }
        let now = self.ctx.clock.now();
        let id = request.investigation_id;
        let target = &request.target;
        let aggregate = self.ctx.load_state(&request.compact, &request.provider_id)?;
        let investigation = aggregate
            .investigation(target, &id)
            .filter(|i| i.is_open())
            .ok_or_else(|| EngineError::NotFound(format!("open investigation {id} on {target}")))?;

        let mut plan = TransactionPlan::new();
        plan.push(txn::close_investigation(
            investigation,
            &request.closing_user,
            request.close_date.unwrap_or(now),
            resulting_encumbrance_id.as_ref(),
            now,
        ));

        let remaining = aggregate.open_investigations_for(target, Some(&id));
        let status_cleared = remaining.is_empty();
        if status_cleared {
            let resolved = aggregate.target(target).ok_or_else(|| {
                EngineError::Internal(format!("investigation {id} references missing {target}"))
            })?;
            if resolved.investigation_status().is_some() {
                let draft = UpdateDraft::new(
                    target.update_subject(),
                    UpdateType::ClosingInvestigation,
                    resolved.item(),
                )
                .remove(INVESTIGATION_STATUS);
                plan.push_all(txn::recorded_change(&aggregate, resolved.item(), draft, now)?);
            }
        } else {
            plan.push_all(remaining.iter().map(|other| txn::still_open(other)));
        }
        self.ctx
            .commit(plan, "close investigation", Some(&investigation.key()))?;
        info!(
            compact = %request.compact,
            provider_id = %request.provider_id,
            target = %target,
            investigation_id = %id,
            status_cleared,
            "investigation closed"
        );
        Ok(CloseOutcome {
            investigation_id: id,
            status_cleared,
            resulting_encumbrance_id,
        })
    }
}
