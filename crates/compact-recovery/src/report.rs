//! # Results Document
//!
//! One JSON document per execution at `{executionName}/rollback-results.json`.
//! Every invocation loads it, appends its own outcomes and writes it back,
//! so entries from earlier invocations are never lost. The cumulative
//! counters returned to the scheduler are the list lengths.

use serde::{Deserialize, Serialize};

use compact_core::{Jurisdiction, LicenseTypeAbbr, ProviderId, Timestamp};
use compact_store::ObjectStore;

use crate::error::RollbackError;

/// What happened to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevertAction {
    /// Restored to its pre-window snapshot.
    Revert,
    /// Created inside the window, so removed.
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRevert {
    pub jurisdiction: Jurisdiction,
    pub license_type_abbr: LicenseTypeAbbr,
    pub action: RevertAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertedProvider {
    pub provider_id: ProviderId,
    pub licenses_reverted: Vec<LicenseRevert>,
    /// `None` when the provider record was left as it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_record: Option<RevertAction>,
    /// Sort keys of the update records removed.
    pub updates_deleted: Vec<String>,
}

/// One record that made a provider ineligible for automatic rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IneligibleUpdate {
    /// `license`, `privilege`, `provider`, `adverseAction` or `investigation`.
    pub record_type: String,
    /// Record path, e.g. `license/oh/slp`.
    pub subject: String,
    pub type_of_update: String,
    pub update_time: Timestamp,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProvider {
    pub provider_id: ProviderId,
    pub reason: String,
    pub ineligible_updates: Vec<IneligibleUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedProvider {
    pub provider_id: ProviderId,
    /// The raw error text.
    pub error: String,
}

/// Accumulated outcomes of one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResults {
    #[serde(default)]
    pub reverted_provider_summaries: Vec<RevertedProvider>,
    #[serde(default)]
    pub skipped_provider_details: Vec<SkippedProvider>,
    #[serde(default)]
    pub failed_provider_details: Vec<FailedProvider>,
}

impl RollbackResults {
    /// Load the document at `key`, or start an empty one.
    pub fn load(objects: &dyn ObjectStore, key: &str) -> Result<Self, RollbackError> {
        let stored = objects.get_json(key).map_err(|source| RollbackError::Results {
            key: key.to_string(),
            source,
        })?;
        match stored {
            Some(value) => {
                serde_json::from_value(value).map_err(|source| RollbackError::MalformedResults {
                    key: key.to_string(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    /// Overwrite the document at `key`.
    pub fn save(&self, objects: &dyn ObjectStore, key: &str) -> Result<(), RollbackError> {
        let value = serde_json::to_value(self).map_err(|source| RollbackError::MalformedResults {
            key: key.to_string(),
            source,
        })?;
        objects
            .put_json(key, &value)
            .map_err(|source| RollbackError::Results {
                key: key.to_string(),
                source,
            })
    }

    pub fn reverted(&self) -> u64 {
        self.reverted_provider_summaries.len() as u64
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_provider_details.len() as u64
    }

    pub fn failed(&self) -> u64 {
        self.failed_provider_details.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compact_store::InMemoryObjectStore;

    #[test]
    fn test_missing_document_starts_empty() {
        let objects = InMemoryObjectStore::new();
        let results = RollbackResults::load(&objects, "exec/rollback-results.json").unwrap();
        assert_eq!(results, RollbackResults::default());
    }

    #[test]
    fn test_save_then_load_appends() {
        let objects = InMemoryObjectStore::new();
        let key = "exec/rollback-results.json";
        let mut results = RollbackResults::load(&objects, key).unwrap();
        results.failed_provider_details.push(FailedProvider {
            provider_id: ProviderId::new(),
            error: "transient store failure: throttled".to_string(),
        });
        results.save(&objects, key).unwrap();

        let mut again = RollbackResults::load(&objects, key).unwrap();
        assert_eq!(again.failed(), 1);
        again.failed_provider_details.push(FailedProvider {
            provider_id: ProviderId::new(),
            error: "boom".to_string(),
        });
        again.save(&objects, key).unwrap();
        assert_eq!(RollbackResults::load(&objects, key).unwrap().failed(), 2);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let objects = InMemoryObjectStore::new();
        let key = "exec/rollback-results.json";
        objects
            .put_json(key, &serde_json::json!({"failedProviderDetails": "nope"}))
            .unwrap();
        let err = RollbackResults::load(&objects, key).unwrap_err();
        assert!(matches!(err, RollbackError::MalformedResults { .. }));
    }
}
