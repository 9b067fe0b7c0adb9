//! Provider root record.

use serde::{Deserialize, Serialize};

use compact_core::{CompactCode, Jurisdiction, ProviderId, Timestamp};
use compact_store::RecordKey;

use super::keys::provider_key;
use super::status::EncumberedStatus;
use super::{RecordType, StoredRecord};

/// The individual professional. Owns every license and privilege in the
/// partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRecord {
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    pub given_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub family_name: String,
    /// Current home jurisdiction.
    pub license_jurisdiction: Jurisdiction,
    /// Aggregate over every license and privilege.
    #[serde(default)]
    pub encumbered_status: EncumberedStatus,
    pub date_of_update: Timestamp,
}

impl ProviderRecord {
    /// Whether any license or privilege under the provider is encumbered.
    pub fn is_encumbered(&self) -> bool {
        self.encumbered_status == EncumberedStatus::Encumbered
    }
}

impl StoredRecord for ProviderRecord {
    const RECORD_TYPE: RecordType = RecordType::Provider;

    fn key(&self) -> RecordKey {
        provider_key(&self.compact, &self.provider_id)
    }
}
