//! Adverse action (encumbrance) record.
//!
//! Written once when the encumbrance is imposed. The only later mutation
//! sets `effectiveLiftDate` and `liftingUser`, guarded so it happens at
//! most once.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use compact_core::{AdverseActionId, CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::RecordKey;

use super::keys::{adverse_action_sort_key, provider_partition_key};
use super::status::ActionAgainst;
use super::{RecordType, StoredRecord};
use crate::target::RecordTarget;

/// Attribute set when the action is lifted.
pub const EFFECTIVE_LIFT_DATE_ATTRIBUTE: &str = "effectiveLiftDate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdverseActionRecord {
    pub adverse_action_id: AdverseActionId,
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    pub action_against: ActionAgainst,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub encumbrance_type: String,
    pub clinical_privilege_action_category: String,
    pub effective_start_date: NaiveDate,
    pub creation_date: Timestamp,
    pub submitting_user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_lift_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifting_user: Option<String>,
    pub date_of_update: Timestamp,
}

impl AdverseActionRecord {
    /// The license or privilege this action restricts.
    pub fn target(&self) -> RecordTarget {
        RecordTarget::new(
            self.action_against,
            self.jurisdiction.clone(),
            self.license_type_abbr.clone(),
        )
    }

    /// Still in force.
    pub fn is_unlifted(&self) -> bool {
        self.effective_lift_date.is_none()
    }
}

impl StoredRecord for AdverseActionRecord {
    const RECORD_TYPE: RecordType = RecordType::AdverseAction;

    fn key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            adverse_action_sort_key(&self.target().sort_key(&self.compact), &self.adverse_action_id),
        )
    }
}
