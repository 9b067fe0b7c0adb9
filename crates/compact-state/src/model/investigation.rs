//! Investigation record. Closed at most once by setting `closeDate`.

use serde::{Deserialize, Serialize};

use compact_core::{AdverseActionId, CompactCode, InvestigationId, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::RecordKey;

use super::keys::{investigation_sort_key, provider_partition_key};
use super::status::ActionAgainst;
use super::{RecordType, StoredRecord};
use crate::target::RecordTarget;

/// Attribute set when the investigation closes.
pub const CLOSE_DATE_ATTRIBUTE: &str = "closeDate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigationRecord {
    pub investigation_id: InvestigationId,
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    pub investigation_against: ActionAgainst,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub submitting_user: String,
    pub creation_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_user: Option<String>,
    /// Adverse action imposed as a result of the investigation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resulting_encumbrance_id: Option<AdverseActionId>,
    pub date_of_update: Timestamp,
}

impl InvestigationRecord {
    /// The license or privilege under investigation.
    pub fn target(&self) -> RecordTarget {
        RecordTarget::new(
            self.investigation_against,
            self.jurisdiction.clone(),
            self.license_type_abbr.clone(),
        )
    }

    pub fn is_open(&self) -> bool {
        self.close_date.is_none()
    }
}

impl StoredRecord for InvestigationRecord {
    const RECORD_TYPE: RecordType = RecordType::Investigation;

    fn key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            investigation_sort_key(&self.target().sort_key(&self.compact), &self.investigation_id),
        )
    }
}
