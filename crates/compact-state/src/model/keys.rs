//! # Key Encoding
//!
//! Every record of one provider shares the partition key
//! `{compact}#PROVIDER#{providerId}`. The sort key encodes the entity:
//!
//! ```text
//! {compact}#PROVIDER                                          provider
//! {compact}#PROVIDER#license/{j}/{abbr}#                      license
//! {compact}#PROVIDER#privilege/{j}/{abbr}#                    privilege
//! {target sk}ADVERSE_ACTION#{id}                              adverse action
//! {target sk}INVESTIGATION#{id}                               investigation
//! {compact}#UPDATE#{tier}#{subject}/{effectiveDate}/{hash}    update record
//! ```
//!
//! Current-state records all begin with `{compact}#PROVIDER`, so one
//! begins-with query reads them without touching history. Update records
//! sort by tier first, then subject, then effective date.

use compact_core::{AdverseActionId, CompactCode, InvestigationId, Jurisdiction, LicenseTypeAbbr, ProviderId};
use compact_store::RecordKey;

use super::update::{UpdateSubject, UpdateTier};

/// Partition key shared by every record of one provider.
pub fn provider_partition_key(compact: &CompactCode, provider_id: &ProviderId) -> String {
    format!("{compact}#PROVIDER#{provider_id}")
}

/// Prefix shared by all current-state sort keys.
pub fn state_prefix(compact: &CompactCode) -> String {
    format!("{compact}#PROVIDER")
}

/// Sort key of the provider record.
pub fn provider_sort_key(compact: &CompactCode) -> String {
    state_prefix(compact)
}

/// Sort key of a license record.
pub fn license_sort_key(
    compact: &CompactCode,
    jurisdiction: &Jurisdiction,
    license_type_abbr: &LicenseTypeAbbr,
) -> String {
    format!("{compact}#PROVIDER#license/{jurisdiction}/{license_type_abbr}#")
}

/// Sort key of a privilege record.
pub fn privilege_sort_key(
    compact: &CompactCode,
    jurisdiction: &Jurisdiction,
    license_type_abbr: &LicenseTypeAbbr,
) -> String {
    format!("{compact}#PROVIDER#privilege/{jurisdiction}/{license_type_abbr}#")
}

/// Sort key of an adverse action nested under its target.
pub fn adverse_action_sort_key(target_sort_key: &str, id: &AdverseActionId) -> String {
    format!("{target_sort_key}ADVERSE_ACTION#{id}")
}

/// Sort key of an investigation nested under its target.
pub fn investigation_sort_key(target_sort_key: &str, id: &InvestigationId) -> String {
    format!("{target_sort_key}INVESTIGATION#{id}")
}

/// Prefix of every update record in one tier.
pub fn update_tier_prefix(compact: &CompactCode, tier: UpdateTier) -> String {
    format!("{compact}#UPDATE#{}#", tier.number())
}

/// Prefix of every update record about one subject.
pub fn update_subject_prefix(compact: &CompactCode, subject: &UpdateSubject) -> String {
    format!(
        "{}{}/",
        update_tier_prefix(compact, subject.tier()),
        subject.path()
    )
}

/// Attribute projected into the license-jurisdiction secondary index.
pub fn license_jurisdiction_key(compact: &CompactCode, jurisdiction: &Jurisdiction) -> String {
    format!("{compact}#JURISDICTION#{jurisdiction}")
}

/// Name of the secondary index over `licenseJurisdictionKey`.
pub const LICENSE_JURISDICTION_INDEX: &str = "licenseJurisdictionIndex";

/// Index partition attribute.
pub const LICENSE_JURISDICTION_KEY_ATTRIBUTE: &str = "licenseJurisdictionKey";

/// Index sort attribute.
pub const PROVIDER_ID_ATTRIBUTE: &str = "providerId";

/// Full key of the provider record.
pub fn provider_key(compact: &CompactCode, provider_id: &ProviderId) -> RecordKey {
    RecordKey::new(
        provider_partition_key(compact, provider_id),
        provider_sort_key(compact),
    )
}
