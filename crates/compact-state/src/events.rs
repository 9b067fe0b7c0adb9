//! # Domain Events
//!
//! Detail types and payloads the engines publish after a transaction
//! commits. Listeners use them for cross-jurisdiction fan-out; the
//! rollback engine announces reverted licenses the same way.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use compact_core::{AdverseActionId, CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::{EventBus, EventError};

/// A license received an adverse action.
pub const LICENSE_ENCUMBRANCE: &str = "license.encumbrance";
/// A license's last adverse action was lifted.
pub const LICENSE_ENCUMBRANCE_LIFTED: &str = "license.encumbranceLifted";
/// A privilege was released from its home license's encumbrance.
pub const PRIVILEGE_ENCUMBRANCE_LIFTED: &str = "privilege.encumbranceLifted";
/// A license was restored to its pre-window state by a rollback.
pub const LICENSE_REVERT: &str = "license.revert";

/// Detail of [`LICENSE_ENCUMBRANCE`] and [`LICENSE_ENCUMBRANCE_LIFTED`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseEncumbranceDetail {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbreviation: LicenseTypeAbbr,
    pub adverse_action_id: AdverseActionId,
    /// Start date for an encumbrance, lift date for a lift.
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegeEncumbranceLiftedDetail {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    /// Jurisdiction of the released privilege.
    pub jurisdiction: Jurisdiction,
    pub license_type_abbreviation: LicenseTypeAbbr,
    pub effective_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRevertDetail {
    pub compact: CompactCode,
    pub provider_id: ProviderId,
    pub jurisdiction: Jurisdiction,
    pub license_type_abbreviation: LicenseTypeAbbr,
    pub rollback_reason: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub execution_name: String,
}

/// Publishes typed details under one source tag.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
    source: String,
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    /// Serialize `detail` and publish it.
    pub fn publish<T: Serialize>(&self, detail_type: &str, detail: &T) -> Result<(), EventError> {
        let map = match serde_json::to_value(detail)? {
            Value::Object(map) => map,
            other => {
                return Err(EventError::Delivery {
                    detail_type: detail_type.to_string(),
                    reason: format!("detail must be an object, got {other}"),
                })
            }
        };
        self.bus.publish(&self.source, detail_type, map)
    }
}
