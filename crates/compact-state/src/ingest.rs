//! # License Upload Writer
//!
//! Applies one jurisdiction license upload to the provider partition the
//! way the ingestion pipeline does: first uploads create the license (and
//! the provider on first sight), later uploads overwrite the license and
//! append an upload-related history entry describing the change.
//!
//! These are the writes a rollback undoes.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use compact_core::{CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId};

use crate::aggregate::ProviderAggregate;
use crate::context::EngineContext;
use crate::error::EngineError;
use crate::model::{
    EncumberedStatus, JurisdictionLicenseStatus, LicenseRecord, ProviderRecord, UpdateDraft,
    UpdateSubject, UpdateType,
};
use crate::txn::{self, TransactionPlan};

/// One license row as uploaded by a jurisdiction.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseUpload {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub jurisdiction: Jurisdiction,
    pub license_type: String,
    pub license_type_abbr: LicenseTypeAbbr,
    pub license_number: Option<String>,
    pub date_of_issuance: NaiveDate,
    pub date_of_expiration: NaiveDate,
    pub status: JurisdictionLicenseStatus,
    pub given_name: String,
    pub middle_name: Option<String>,
    pub family_name: String,
}

/// What an upload did to the license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First upload of this license.
    Created,
    /// Existing license changed; the history entry has this type.
    Updated(UpdateType),
    /// License unchanged; the provider's names changed.
    ProviderUpdated,
    /// Nothing differed from the stored records.
    Unchanged,
}

/// Writes license uploads.
#[derive(Debug, Clone)]
pub struct LicenseIngestor {
    ctx: EngineContext,
}

impl LicenseIngestor {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub fn ingest(&self, upload: LicenseUpload) -> Result<IngestOutcome, EngineError> {
        let now = self.ctx.clock.now();
        let aggregate = match self.ctx.load_state(&upload.compact, &upload.provider_id) {
            Ok(aggregate) => aggregate,
            Err(EngineError::NotFound(_)) => {
                ProviderAggregate::from_items(upload.compact.clone(), upload.provider_id, Vec::new())?
            }
            Err(err) => return Err(err),
        };

        let mut plan = TransactionPlan::new();
        let mut provider_changed = false;
        match aggregate.provider() {
            None => plan.push(txn::create(&ProviderRecord {
                provider_id: upload.provider_id,
                compact: upload.compact.clone(),
                given_name: upload.given_name.clone(),
                middle_name: upload.middle_name.clone(),
                family_name: upload.family_name.clone(),
                license_jurisdiction: upload.jurisdiction.clone(),
                encumbered_status: EncumberedStatus::Unencumbered,
                date_of_update: now,
            })?),
            Some(provider) => {
                let mut draft = None;
                for (name, stored, uploaded) in [
                    ("givenName", Some(&provider.given_name), Some(&upload.given_name)),
                    ("middleName", provider.middle_name.as_ref(), upload.middle_name.as_ref()),
                    ("familyName", Some(&provider.family_name), Some(&upload.family_name)),
                ] {
                    if stored != uploaded {
                        let current = draft.take().unwrap_or_else(|| {
                            provider_draft(&aggregate, UpdateType::LicenseUploadUpdateOther)
                        });
                        draft = Some(diff(current, name, uploaded.cloned().map(Value::String)));
                    }
                }
                if let (Some(draft), Some(item)) = (draft, provider_item(&aggregate)) {
                    plan.push_all(txn::recorded_change(&aggregate, item, draft, now)?);
                    provider_changed = true;
                }
            }
        }

        let existing = aggregate.license(&upload.jurisdiction, &upload.license_type_abbr);
        let license = LicenseRecord {
            provider_id: upload.provider_id,
            compact: upload.compact.clone(),
            jurisdiction: upload.jurisdiction.clone(),
            license_type: upload.license_type.clone(),
            license_type_abbr: upload.license_type_abbr.clone(),
            license_number: upload.license_number.clone(),
            date_of_issuance: upload.date_of_issuance,
            date_of_expiration: upload.date_of_expiration,
            jurisdiction_uploaded_license_status: upload.status,
            encumbered_status: existing.map(|l| l.encumbered_status).unwrap_or_default(),
            investigation_status: existing.and_then(|l| l.investigation_status),
            first_upload_date: existing.map(|l| l.first_upload_date).unwrap_or(now),
            date_of_update: now,
        };

        let outcome = match existing {
            None => {
                plan.push(txn::create(&license)?);
                IngestOutcome::Created
            }
            Some(stored) => {
                let update_type = classify(stored, &license);
                let subject = UpdateSubject::License {
                    jurisdiction: license.jurisdiction.clone(),
                    license_type_abbr: license.license_type_abbr.clone(),
                };
                let item = aggregate
                    .item(&subject.record_sort_key(&license.compact))
                    .ok_or_else(|| EngineError::Internal("license decoded without a raw item".into()))?;
                let mut draft = UpdateDraft::new(subject, update_type, item);
                let mut changed = false;
                for (name, stored_value, uploaded_value) in uploaded_fields(stored, &license) {
                    if stored_value != uploaded_value {
                        draft = diff(draft, name, uploaded_value);
                        changed = true;
                    }
                }
                if changed {
                    plan.push_all(txn::recorded_change(&aggregate, item, draft, now)?);
                    IngestOutcome::Updated(update_type)
                } else if provider_changed {
                    IngestOutcome::ProviderUpdated
                } else {
                    IngestOutcome::Unchanged
                }
            }
        };

        self.ctx.commit(plan, "ingest license", None)?;
        info!(
            compact = %upload.compact,
            provider_id = %upload.provider_id,
            jurisdiction = %upload.jurisdiction,
            outcome = ?outcome,
            "license upload applied"
        );
        Ok(outcome)
    }
}

fn provider_item(aggregate: &ProviderAggregate) -> Option<&compact_store::Item> {
    aggregate.item(&UpdateSubject::Provider.record_sort_key(aggregate.compact()))
}

fn provider_draft(aggregate: &ProviderAggregate, update_type: UpdateType) -> UpdateDraft {
    let empty = compact_store::Item::new();
    let item = provider_item(aggregate).unwrap_or(&empty);
    UpdateDraft::new(UpdateSubject::Provider, update_type, item)
}

fn diff(draft: UpdateDraft, name: &str, value: Option<Value>) -> UpdateDraft {
    match value {
        Some(value) => draft.set(name, value),
        None => draft.remove(name),
    }
}

/// Deactivation wins over renewal, which wins over anything else.
fn classify(stored: &LicenseRecord, uploaded: &LicenseRecord) -> UpdateType {
    if stored.jurisdiction_uploaded_license_status == JurisdictionLicenseStatus::Active
        && uploaded.jurisdiction_uploaded_license_status == JurisdictionLicenseStatus::Inactive
    {
        UpdateType::Deactivation
    } else if uploaded.date_of_expiration > stored.date_of_expiration {
        UpdateType::Renewal
    } else {
        UpdateType::LicenseUploadUpdateOther
    }
}

fn uploaded_fields(
    stored: &LicenseRecord,
    uploaded: &LicenseRecord,
) -> Vec<(&'static str, Option<Value>, Option<Value>)> {
    let text = |s: &str| Some(Value::String(s.to_string()));
    let date = |d: NaiveDate| Some(Value::String(d.to_string()));
    vec![
        ("licenseType", text(&stored.license_type), text(&uploaded.license_type)),
        (
            "licenseNumber",
            stored.license_number.as_deref().and_then(text),
            uploaded.license_number.as_deref().and_then(text),
        ),
        ("dateOfIssuance", date(stored.date_of_issuance), date(uploaded.date_of_issuance)),
        (
            "dateOfExpiration",
            date(stored.date_of_expiration),
            date(uploaded.date_of_expiration),
        ),
        (
            "jurisdictionUploadedLicenseStatus",
            text(stored.jurisdiction_uploaded_license_status.as_str()),
            text(uploaded.jurisdiction_uploaded_license_status.as_str()),
        ),
    ]
}
