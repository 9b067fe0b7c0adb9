//! # Encumbrance and Investigation Targets
//!
//! Adverse actions and investigations apply to either a license or a
//! privilege. The engines resolve the target once, at entry, into a
//! [`TargetRecord`] and work against the shared [`StatusBearing`]
//! capability from then on.

use compact_core::{CompactCode, Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::{Item, RecordKey};

use crate::model::keys::{license_sort_key, privilege_sort_key, provider_partition_key};
use crate::model::{
    ActionAgainst, InvestigationStatus, LicenseRecord, PrivilegeRecord, UpdateSubject,
};

/// Address of a license or privilege within a provider partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordTarget {
    License {
        jurisdiction: Jurisdiction,
        license_type_abbr: LicenseTypeAbbr,
    },
    Privilege {
        jurisdiction: Jurisdiction,
        license_type_abbr: LicenseTypeAbbr,
    },
}

impl RecordTarget {
    pub fn license(jurisdiction: Jurisdiction, license_type_abbr: LicenseTypeAbbr) -> Self {
        Self::License {
            jurisdiction,
            license_type_abbr,
        }
    }

    pub fn privilege(jurisdiction: Jurisdiction, license_type_abbr: LicenseTypeAbbr) -> Self {
        Self::Privilege {
            jurisdiction,
            license_type_abbr,
        }
    }

    /// Build from a stored `actionAgainst` / `investigationAgainst` value.
    pub fn new(
        kind: ActionAgainst,
        jurisdiction: Jurisdiction,
        license_type_abbr: LicenseTypeAbbr,
    ) -> Self {
        match kind {
            ActionAgainst::License => Self::license(jurisdiction, license_type_abbr),
            ActionAgainst::Privilege => Self::privilege(jurisdiction, license_type_abbr),
        }
    }

    pub fn kind(&self) -> ActionAgainst {
        match self {
            Self::License { .. } => ActionAgainst::License,
            Self::Privilege { .. } => ActionAgainst::Privilege,
        }
    }

    pub fn jurisdiction(&self) -> &Jurisdiction {
        match self {
            Self::License { jurisdiction, .. } | Self::Privilege { jurisdiction, .. } => {
                jurisdiction
            }
        }
    }

    pub fn license_type_abbr(&self) -> &LicenseTypeAbbr {
        match self {
            Self::License {
                license_type_abbr, ..
            }
            | Self::Privilege {
                license_type_abbr, ..
            } => license_type_abbr,
        }
    }

    /// Sort key of the target record.
    pub fn sort_key(&self, compact: &CompactCode) -> String {
        match self {
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

    /// Full key of the target record.
    pub fn key(&self, compact: &CompactCode, provider_id: &ProviderId) -> RecordKey {
        RecordKey::new(
            provider_partition_key(compact, provider_id),
            self.sort_key(compact),
        )
    }

    /// History subject for updates to the target.
    pub fn update_subject(&self) -> UpdateSubject {
        match self {
            Self::License {
                jurisdiction,
                license_type_abbr,
            } => UpdateSubject::License {
                jurisdiction: jurisdiction.clone(),
                license_type_abbr: license_type_abbr.clone(),
            },
            Self::Privilege {
                jurisdiction,
                license_type_abbr,
            } => UpdateSubject::Privilege {
                jurisdiction: jurisdiction.clone(),
                license_type_abbr: license_type_abbr.clone(),
            },
        }
    }
}

impl std::fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.kind(),
            self.jurisdiction(),
            self.license_type_abbr()
        )
    }
}

/// Status fields shared by licenses and privileges.
pub trait StatusBearing {
    /// Carries its own unlifted adverse action.
    fn is_encumbered(&self) -> bool;

    fn investigation_status(&self) -> Option<InvestigationStatus>;

    fn date_of_update(&self) -> Timestamp;
}

impl StatusBearing for LicenseRecord {
    fn is_encumbered(&self) -> bool {
        LicenseRecord::is_encumbered(self)
    }

    fn investigation_status(&self) -> Option<InvestigationStatus> {
        self.investigation_status
    }

    fn date_of_update(&self) -> Timestamp {
        self.date_of_update
    }
}

impl StatusBearing for PrivilegeRecord {
    fn is_encumbered(&self) -> bool {
        PrivilegeRecord::is_encumbered(self)
    }

    fn investigation_status(&self) -> Option<InvestigationStatus> {
        self.investigation_status
    }

    fn date_of_update(&self) -> Timestamp {
        self.date_of_update
    }
}

/// A resolved target: the typed record plus its raw item, which history
/// entries capture as `previous`.
#[derive(Debug, Clone, Copy)]
pub enum TargetRecord<'a> {
    License {
        record: &'a LicenseRecord,
        item: &'a Item,
    },
    Privilege {
        record: &'a PrivilegeRecord,
        item: &'a Item,
    },
}

impl<'a> TargetRecord<'a> {
    /// The raw stored item.
    pub fn item(&self) -> &'a Item {
        match self {
            Self::License { item, .. } | Self::Privilege { item, .. } => item,
        }
    }

    fn status(&self) -> &'a dyn StatusBearing {
        match self {
            Self::License { record, .. } => *record,
            Self::Privilege { record, .. } => *record,
        }
    }
}

impl StatusBearing for TargetRecord<'_> {
    fn is_encumbered(&self) -> bool {
        self.status().is_encumbered()
    }

    fn investigation_status(&self) -> Option<InvestigationStatus> {
        self.status().investigation_status()
    }

    fn date_of_update(&self) -> Timestamp {
        self.status().date_of_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_keys_and_display() {
        let compact = CompactCode::new("aslp").unwrap();
        let target = RecordTarget::privilege(
            Jurisdiction::new("ne").unwrap(),
            LicenseTypeAbbr::new("slp").unwrap(),
        );
        assert_eq!(target.kind(), ActionAgainst::Privilege);
        assert_eq!(target.sort_key(&compact), "aslp#PROVIDER#privilege/ne/slp#");
        assert_eq!(target.to_string(), "privilege ne/slp");
        assert_eq!(target.update_subject().path(), "privilege/ne/slp");
    }

    #[test]
    fn test_new_dispatches_on_kind() {
        let j = Jurisdiction::new("oh").unwrap();
        let abbr = LicenseTypeAbbr::new("aud").unwrap();
        assert!(matches!(
            RecordTarget::new(ActionAgainst::License, j.clone(), abbr.clone()),
            RecordTarget::License { .. }
        ));
        assert!(matches!(
            RecordTarget::new(ActionAgainst::Privilege, j, abbr),
            RecordTarget::Privilege { .. }
        ));
    }
}
