//! Privilege record: the right to practice in a non-home jurisdiction,
//! derived from a home license.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use compact_core::{CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::RecordKey;

use super::keys::{privilege_sort_key, provider_partition_key};
use super::status::{
    HomeJurisdictionChangeStatus, InvestigationStatus, LicenseDeactivatedStatus,
    PrivilegeEncumberedStatus,
};
use super::{LicenseRecord, RecordType, StoredRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeRecord {
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    /// Jurisdiction the privilege grants practice in.
    pub jurisdiction: Jurisdiction,
    /// Jurisdiction of the home license the privilege derives from.
    pub license_jurisdiction: Jurisdiction,
    pub license_type: String,
    pub license_type_abbr: LicenseTypeAbbr,
    /// Human-readable identifier, e.g. `SLP-NE-12`.
    pub privilege_id: String,
    pub date_of_issuance: NaiveDate,
    pub date_of_expiration: NaiveDate,
    #[serde(default)]
    pub encumbered_status: PrivilegeEncumberedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investigation_status: Option<InvestigationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_jurisdiction_change_status: Option<HomeJurisdictionChangeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_deactivated_status: Option<LicenseDeactivatedStatus>,
    pub date_of_update: Timestamp,
}

impl PrivilegeRecord {
    /// Whether the privilege carries its own unlifted adverse action.
    pub fn is_encumbered(&self) -> bool {
        self.encumbered_status == PrivilegeEncumberedStatus::Encumbered
    }

    /// Whether this privilege still follows `license`: same home
    /// jurisdiction and license type, and not detached by a home
    /// jurisdiction change.
    pub fn follows(&self, license: &LicenseRecord) -> bool {
        self.license_jurisdiction == license.jurisdiction
            && self.license_type_abbr == license.license_type_abbr
            && self.home_jurisdiction_change_status.is_none()
    }
}

impl StoredRecord for PrivilegeRecord {
    const RECORD_TYPE: RecordType = RecordType::Privilege;

    fn key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            privilege_sort_key(&self.compact, &self.jurisdiction, &self.license_type_abbr),
        )
    }
}
