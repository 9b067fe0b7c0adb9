//! # Update History
//!
//! Every mutation of a provider, license or privilege appends one
//! [`UpdateRecord`] beside the overwritten current-state row. A record
//! captures the full item as it was before the mutation (`previous`) and
//! the structural diff applied to it (`updatedValues`, `removedValues`).
//! That is enough to replay the mutation or undo it without re-deriving
//! any business rule.
//!
//! Update records are grouped into tiers so readers can fetch state alone
//! or state plus history up to a tier:
//!
//! | Tier | Subject |
//! |------|---------|
//! | 1 | provider |
//! | 2 | privilege |
//! | 3 | license |
//!
//! Records are never modified. The sort key embeds the effective date and
//! a SHA-256 over the canonical record content, so two distinct mutations
//! never collide and a retried write of the same mutation is idempotent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use compact_core::{
    sha256_hex, CanonicalBytes, CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp,
};
use compact_store::{Item, RecordKey, UpdateExpression};

use super::keys::{
    license_jurisdiction_key, license_sort_key, privilege_sort_key, provider_partition_key,
    provider_sort_key, update_subject_prefix, LICENSE_JURISDICTION_KEY_ATTRIBUTE,
};
use super::{RecordType, StoredRecord};
use crate::error::ModelError;

// ─── Tiers ───────────────────────────────────────────────────────────

/// History tier of an update record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateTier {
    Provider,
    Privilege,
    License,
}

impl UpdateTier {
    /// All tiers in ascending order.
    pub const ALL: [UpdateTier; 3] = [Self::Provider, Self::Privilege, Self::License];

    /// Number embedded in sort keys.
    pub fn number(&self) -> u8 {
        match self {
            Self::Provider => 1,
            Self::Privilege => 2,
            Self::License => 3,
        }
    }

    /// Tier for a sort-key number.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.number() == number)
    }
}

/// How much history a read includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTierBound {
    /// Current state only.
    None,
    /// Current state plus update records of tiers `1..=tier`.
    UpTo(UpdateTier),
}

impl UpdateTierBound {
    /// Everything.
    pub const ALL: UpdateTierBound = UpdateTierBound::UpTo(UpdateTier::License);

    /// Bound for a configured number; `0` means state only.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(Self::None),
            n => UpdateTier::from_number(n).map(Self::UpTo),
        }
    }

    /// Tiers included by this bound.
    pub fn tiers(&self) -> Vec<UpdateTier> {
        match self {
            Self::None => Vec::new(),
            Self::UpTo(max) => UpdateTier::ALL
                .into_iter()
                .filter(|tier| tier <= max)
                .collect(),
        }
    }
}

// ─── Update Types ────────────────────────────────────────────────────

/// What kind of mutation an update record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateType {
    /// Upload extended the expiration date.
    Renewal,
    /// Upload changed the jurisdiction status to inactive.
    Deactivation,
    /// Any other field change made by an upload.
    LicenseUploadUpdateOther,
    /// An adverse action against the record itself.
    Encumbrance,
    /// Privilege encumbered because its home license was.
    LicenseEncumbrance,
    /// The record's last adverse action was lifted.
    LiftingEncumbrance,
    /// Privilege released because its home license was lifted.
    LicenseEncumbranceLifted,
    /// An investigation opened.
    Investigation,
    /// The last open investigation closed.
    ClosingInvestigation,
    /// Provider moved their home jurisdiction.
    HomeJurisdictionChange,
    /// Provider registered an account.
    Registration,
    Other,
}

impl UpdateType {
    /// Whether the mutation came from a jurisdiction license upload.
    /// Only these are undone by a rollback.
    pub fn is_upload_related(&self) -> bool {
        matches!(
            self,
            Self::Renewal | Self::Deactivation | Self::LicenseUploadUpdateOther
        )
    }

    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Renewal => "renewal",
            Self::Deactivation => "deactivation",
            Self::LicenseUploadUpdateOther => "licenseUploadUpdateOther",
            Self::Encumbrance => "encumbrance",
            Self::LicenseEncumbrance => "licenseEncumbrance",
            Self::LiftingEncumbrance => "liftingEncumbrance",
            Self::LicenseEncumbranceLifted => "licenseEncumbranceLifted",
            Self::Investigation => "investigation",
            Self::ClosingInvestigation => "closingInvestigation",
            Self::HomeJurisdictionChange => "homeJurisdictionChange",
            Self::Registration => "registration",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Subjects ────────────────────────────────────────────────────────

/// The current-state record an update describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "updateSubject", rename_all = "camelCase")]
pub enum UpdateSubject {
    Provider,
    License {
        jurisdiction: Jurisdiction,
        #[serde(rename = "licenseTypeAbbr")]
        license_type_abbr: LicenseTypeAbbr,
    },
    Privilege {
        jurisdiction: Jurisdiction,
        #[serde(rename = "licenseTypeAbbr")]
        license_type_abbr: LicenseTypeAbbr,
    },
}

impl UpdateSubject {
    /// History tier the subject's updates live in.
    pub fn tier(&self) -> UpdateTier {
        match self {
            Self::Provider => UpdateTier::Provider,
            Self::Privilege { .. } => UpdateTier::Privilege,
            Self::License { .. } => UpdateTier::License,
        }
    }

    /// Path segment used in sort keys, e.g. `license/oh/slp`.
    pub fn path(&self) -> String {
        match self {
            Self::Provider => "provider".to_string(),
            Self::License {
                jurisdiction,
                license_type_abbr,
            } => format!("license/{jurisdiction}/{license_type_abbr}"),
            Self::Privilege {
                jurisdiction,
                license_type_abbr,
            } => format!("privilege/{jurisdiction}/{license_type_abbr}"),
        }
    }

    /// Sort key of the current-state record this subject names.
    pub fn record_sort_key(&self, compact: &CompactCode) -> String {
        match self {
            Self::Provider => provider_sort_key(compact),
            Self::License {
                jurisdiction,
                license_type_abbr,
            } => license_sort_key(compact, jurisdiction, license_type_abbr),
            Self::Privilege {
                jurisdiction,
                license_type_abbr,
            } => privilege_sort_key(compact, jurisdiction, license_type_abbr),
        }
    }
}

// ─── Update Records ──────────────────────────────────────────────────

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecord {
    pub provider_id: ProviderId,
    pub compact: CompactCode,
    #[serde(flatten)]
    pub subject: UpdateSubject,
    pub update_type: UpdateType,
    /// The full current-state item as it was before the mutation.
    pub previous: Map<String, Value>,
    #[serde(default)]
    pub updated_values: Map<String, Value>,
    #[serde(default)]
    pub removed_values: Vec<String>,
    pub create_date: Timestamp,
    pub effective_date: Timestamp,
    content_hash: String,
}

impl UpdateRecord {
    /// SHA-256 over the canonical content, as embedded in the sort key.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// The `previous` snapshot as a store item, ready to be written back.
    pub fn previous_item(&self) -> Item {
        Item::from_map(self.previous.clone())
    }

    /// Key of the current-state record this update describes.
    pub fn subject_key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            self.subject.record_sort_key(&self.compact),
        )
    }

    /// Apply the recorded diff to `previous`, yielding the state right
    /// after the mutation.
    pub fn replay(&self) -> Item {
        let mut item = self.previous_item();
        self.as_update_expression().apply(&mut item);
        item
    }

    /// The diff as a store update expression.
    pub fn as_update_expression(&self) -> UpdateExpression {
        let mut update = UpdateExpression::new();
        for (name, value) in &self.updated_values {
            update = update.set(name, value.clone());
        }
        for name in &self.removed_values {
            update = update.remove(name);
        }
        update
    }

    /// `start <= createDate < end`.
    pub fn created_within(&self, start: Timestamp, end: Timestamp) -> bool {
        start <= self.create_date && self.create_date < end
    }
}

impl StoredRecord for UpdateRecord {
    const RECORD_TYPE: RecordType = RecordType::Update;

    fn key(&self) -> RecordKey {
        RecordKey::new(
            provider_partition_key(&self.compact, &self.provider_id),
            format!(
                "{}{}/{}",
                update_subject_prefix(&self.compact, &self.subject),
                self.effective_date,
                self.content_hash
            ),
        )
    }

    fn projected_attributes(&self) -> Vec<(&'static str, Value)> {
        match &self.subject {
            UpdateSubject::License { jurisdiction, .. } => vec![(
                LICENSE_JURISDICTION_KEY_ATTRIBUTE,
                Value::String(license_jurisdiction_key(&self.compact, jurisdiction)),
            )],
            _ => Vec::new(),
        }
    }
}

// ─── Drafts ──────────────────────────────────────────────────────────

/// A mutation being prepared: the prior item plus the diff to apply.
///
/// The same draft yields both the history entry ([`UpdateDraft::finish`])
/// and the matching current-state update ([`UpdateDraft::update_expression`]),
/// so the two cannot drift apart.
#[derive(Debug, Clone)]
pub struct UpdateDraft {
    subject: UpdateSubject,
    update_type: UpdateType,
    previous: Map<String, Value>,
    updated_values: Map<String, Value>,
    removed_values: Vec<String>,
    effective_date: Option<Timestamp>,
}

impl UpdateDraft {
    pub fn new(subject: UpdateSubject, update_type: UpdateType, previous: &Item) -> Self {
        Self {
            subject,
            update_type,
            previous: previous.as_map().clone(),
            updated_values: Map::new(),
            removed_values: Vec::new(),
            effective_date: None,
        }
    }

    /// Record `name = value`.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.updated_values.insert(name.to_string(), value.into());
        self
    }

    /// Record removal of `name`.
    pub fn remove(mut self, name: &str) -> Self {
        self.removed_values.push(name.to_string());
        self
    }

    /// When the mutation takes effect; defaults to the create date.
    pub fn effective(mut self, at: Timestamp) -> Self {
        self.effective_date = Some(at);
        self
    }

    /// Current-state update matching the diff, stamped with `dateOfUpdate`.
    pub fn update_expression(&self, now: Timestamp) -> UpdateExpression {
        let mut update = UpdateExpression::new();
        for (name, value) in &self.updated_values {
            update = update.set(name, value.clone());
        }
        for name in &self.removed_values {
            update = update.remove(name);
        }
        update.set("dateOfUpdate", now.to_iso8601())
    }

    /// Seal the draft into an immutable record.
    pub fn finish(
        self,
        compact: &CompactCode,
        provider_id: &ProviderId,
        create_date: Timestamp,
    ) -> Result<UpdateRecord, ModelError> {
        let effective_date = self.effective_date.unwrap_or(create_date);
        let content_hash = sha256_hex(&CanonicalBytes::new(&HashInput {
            provider_id,
            subject: self.subject.path(),
            update_type: self.update_type,
            previous: &self.previous,
            updated_values: &self.updated_values,
            removed_values: &self.removed_values,
            create_date,
        })?);
        Ok(UpdateRecord {
            provider_id: *provider_id,
            compact: compact.clone(),
            subject: self.subject,
            update_type: self.update_type,
            previous: self.previous,
            updated_values: self.updated_values,
            removed_values: self.removed_values,
            create_date,
            effective_date,
            content_hash,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    provider_id: &'a ProviderId,
    subject: String,
    update_type: UpdateType,
    previous: &'a Map<String, Value>,
    updated_values: &'a Map<String, Value>,
    removed_values: &'a [String],
    create_date: Timestamp,
}
