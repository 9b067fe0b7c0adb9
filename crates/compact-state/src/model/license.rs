//! License record, uploaded by the issuing (home) jurisdiction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use compact_core::{CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::RecordKey;

use super::keys::{
    license_jurisdiction_key, license_sort_key, provider_partition_key,
    LICENSE_JURISDICTION_KEY_ATTRIBUTE,
};
use super::status::{EncumberedStatus, InvestigationStatus, JurisdictionLicenseStatus};
use super::{RecordType, StoredRecord};

/// A license issued by a home jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    pub jurisdiction: Jurisdiction,
    pub license_type: String,
    pub license_type_abbr: LicenseTypeAbbr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    pub date_of_issuance: NaiveDate,
    pub date_of_expiration: NaiveDate,
    pub jurisdiction_uploaded_license_status: JurisdictionLicenseStatus,
    #[serde(default)]
    pub encumbered_status: EncumberedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_status: Option<InvestigationStatus>,
    /// When the first upload of this license was ingested. Rollback deletes
    /// licenses whose first upload falls inside the window.
    pub first_upload_date: Timestamp,
    pub date_of_update: Timestamp,
}

impl LicenseRecord {
    /// Whether an unlifted adverse action applies to this license.
    pub fn is_encumbered(&self) -> bool {
        self.encumbered_status == EncumberedStatus::Encumbered
    }
}

impl StoredRecord for LicenseRecord {
    const RECORD_TYPE: RecordType = RecordType::License;

    fn key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            license_sort_key(&self.compact, &self.jurisdiction, &self.license_type_abbr),
        )
    }

    fn projected_attributes(&self) -> Vec<(&'static str, Value)> {
        vec![(
            LICENSE_JURISDICTION_KEY_ATTRIBUTE,
            Value::String(license_jurisdiction_key(&self.compact, &self.jurisdiction)),
        )]
    }
}
