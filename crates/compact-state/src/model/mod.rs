//! # Record Model
//!
//! Typed schemas for everything stored under a provider partition, and the
//! [`StoredRecord`] conversion between typed records and raw store items.
//!
//! Items keep three bookkeeping attributes beside the record's own fields:
//! `pk`, `sk` and `type`. Records that feed the license-jurisdiction index
//! also carry `licenseJurisdictionKey`.

pub mod adverse_action;
pub mod investigation;
pub mod keys;
pub mod license;
pub mod privilege;
pub mod provider;
pub mod status;
pub mod update;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use compact_store::{Item, RecordKey};

use crate::error::ModelError;

pub use adverse_action::AdverseActionRecord;
pub use investigation::InvestigationRecord;
pub use license::LicenseRecord;
pub use privilege::PrivilegeRecord;
pub use provider::ProviderRecord;
pub use status::{
    ActionAgainst, EncumberedStatus, HomeJurisdictionChangeStatus, InvestigationStatus,
    JurisdictionLicenseStatus, LicenseDeactivatedStatus, PrivilegeEncumberedStatus,
};
pub use update::{
    UpdateDraft, UpdateRecord, UpdateSubject, UpdateTier, UpdateTierBound, UpdateType,
};

/// Attribute naming the record type of an item.
pub const TYPE_ATTRIBUTE: &str = "type";

/// Discriminator stored in every item's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Provider root record.
    Provider,
    /// License record.
    License,
    /// Privilege record.
    Privilege,
    /// Adverse action (encumbrance) record.
    AdverseAction,
    /// Investigation record.
    Investigation,
    /// Append-only history entry.
    Update,
}

impl RecordType {
    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::License => "license",
            Self::Privilege => "privilege",
            Self::AdverseAction => "adverseAction",
            Self::Investigation => "investigation",
            Self::Update => "update",
        }
    }

    /// Parse a stored attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "provider" => Some(Self::Provider),
            "license" => Some(Self::License),
            "privilege" => Some(Self::Privilege),
            "adverseAction" => Some(Self::AdverseAction),
            "investigation" => Some(Self::Investigation),
            "update" => Some(Self::Update),
            _ => None,
        }
    }

    /// Record type of a raw item, if recognised.
    pub fn of_item(item: &Item) -> Option<Self> {
        item.get_str(TYPE_ATTRIBUTE).and_then(Self::parse)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record that lives in the provider partition.
pub trait StoredRecord: Serialize + DeserializeOwned {
    /// Value written to the `type` attribute.
    const RECORD_TYPE: RecordType;

    /// Primary key of this record.
    fn key(&self) -> RecordKey;

    /// Extra attributes written for secondary indexes.
    fn projected_attributes(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Encode as a store item with key, type and projections.
    fn to_item(&self) -> Result<Item, ModelError> {
        let mut item = Item::from_serializable(self)?;
        item.set_key(&self.key());
        item.set(
            TYPE_ATTRIBUTE,
            Value::String(Self::RECORD_TYPE.as_str().to_string()),
        );
        for (name, value) in self.projected_attributes() {
            item.set(name, value);
        }
        Ok(item)
    }

    /// Decode from a store item, checking the `type` attribute.
    fn from_item(item: &Item) -> Result<Self, ModelError> {
        let found = item.get_str(TYPE_ATTRIBUTE).unwrap_or_default();
        if found != Self::RECORD_TYPE.as_str() {
            return Err(ModelError::UnexpectedRecordType {
                expected: Self::RECORD_TYPE.as_str(),
                found: found.to_string(),
            });
        }
        Ok(item.to_typed()?)
    }
}
