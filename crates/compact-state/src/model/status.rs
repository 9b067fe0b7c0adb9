//! Status vocabularies stored on provider, license and privilege records.

use serde::{Deserialize, Serialize};

/// Encumbrance state of a provider or license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EncumberedStatus {
    /// No unlifted adverse action applies.
    #[default]
    Unencumbered,
    /// At least one unlifted adverse action applies.
    Encumbered,
}

impl EncumberedStatus {
    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unencumbered => "unencumbered",
            Self::Encumbered => "encumbered",
        }
    }
}

/// Encumbrance state of a privilege.
///
/// `LicenseEncumbered` is never the result of an action against the
/// privilege itself; it mirrors an encumbrance on the home license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrivilegeEncumberedStatus {
    /// Neither the privilege nor its home license is encumbered.
    #[default]
    Unencumbered,
    /// The privilege carries its own unlifted adverse action.
    Encumbered,
    /// Only the home license is encumbered.
    LicenseEncumbered,
}

impl PrivilegeEncumberedStatus {
    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unencumbered => "unencumbered",
            Self::Encumbered => "encumbered",
            Self::LicenseEncumbered => "licenseEncumbered",
        }
    }
}

/// Investigation marker on a license or privilege. Absent means no open
/// investigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InvestigationStatus {
    /// At least one investigation is open.
    UnderInvestigation,
}

impl InvestigationStatus {
    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        "underInvestigation"
    }
}

/// Which kind of record an adverse action or investigation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionAgainst {
    /// A license issued by a home jurisdiction.
    License,
    /// A privilege derived from a license.
    Privilege,
}

impl std::fmt::Display for ActionAgainst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::License => "license",
            Self::Privilege => "privilege",
        })
    }
}

/// Status uploaded by the issuing jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JurisdictionLicenseStatus {
    /// The jurisdiction reports the license as active.
    Active,
    /// The jurisdiction reports the license as inactive.
    Inactive,
}

impl JurisdictionLicenseStatus {
    /// Stored attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// Set on a privilege once the provider moved their home jurisdiction away
/// from the privilege's license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HomeJurisdictionChangeStatus {
    /// The privilege no longer follows its original home license.
    Inactive,
}

/// Set on a privilege when its home license was deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LicenseDeactivatedStatus {
    /// The home license is no longer active.
    LicenseDeactivated,
}
