//! Invocation input and output.
//!
//! The scheduler passes the previous output's cursor and counters back in
//! on the next call, so every field is plain data. Input fields arrive as
//! strings and are validated here rather than at deserialization, so a
//! malformed request still gets a `FAILED` answer.

use serde::{Deserialize, Serialize};

use compact_core::{CompactCode, Jurisdiction, ProviderId, Timestamp};

use crate::config::RollbackConfig;

/// One rollback invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackInput {
    pub compact: String,
    pub jurisdiction: String,
    /// RFC 3339, inclusive.
    pub start_date_time: String,
    /// RFC 3339, exclusive.
    pub end_date_time: String,
    pub rollback_reason: String,
    pub execution_name: String,
    /// Providers examined by earlier invocations of this execution.
    #[serde(default)]
    pub providers_processed: u64,
    /// First provider not yet examined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_from_provider_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollbackStatus {
    Complete,
    InProgress,
    Failed,
}

/// Result of one invocation. Counters are cumulative over the execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackOutput {
    pub rollback_status: RollbackStatus,
    pub providers_processed: u64,
    pub providers_reverted: u64,
    pub providers_skipped: u64,
    pub providers_failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_from_provider_id: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RollbackOutput {
    /// A rejected request; no work was done.
    pub fn failed(providers_processed: u64, error: impl Into<String>) -> Self {
        Self {
            rollback_status: RollbackStatus::Failed,
            providers_processed,
            providers_reverted: 0,
            providers_skipped: 0,
            providers_failed: 0,
            continue_from_provider_id: None,
            error: Some(error.into()),
        }
    }

    /// Input for the next invocation, if this one stopped early.
    pub fn next_input(&self, previous: &RollbackInput) -> Option<RollbackInput> {
        if self.rollback_status != RollbackStatus::InProgress {
            return None;
        }
        Some(RollbackInput {
            providers_processed: self.providers_processed,
            continue_from_provider_id: self.continue_from_provider_id.map(|id| id.to_string()),
            ..previous.clone()
        })
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct RollbackRequest {
    pub compact: CompactCode,
    pub jurisdiction: Jurisdiction,
    pub start: Timestamp,
    pub end: Timestamp,
    pub rollback_reason: String,
    pub execution_name: String,
    pub providers_processed: u64,
    pub continue_from: Option<ProviderId>,
}

impl RollbackRequest {
    /// `start <= at < end`.
    pub fn contains(&self, at: Timestamp) -> bool {
        self.start <= at && at < self.end
    }
}

impl RollbackInput {
    /// Check the request against `config`. The error is the message
    /// returned to the caller.
    pub fn validate(&self, config: &RollbackConfig) -> Result<RollbackRequest, String> {
        for (name, value) in [
            ("compact", &self.compact),
            ("jurisdiction", &self.jurisdiction),
            ("executionName", &self.execution_name),
            ("rollbackReason", &self.rollback_reason),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }
        let compact = CompactCode::new(&self.compact).map_err(|e| e.to_string())?;
        let jurisdiction = Jurisdiction::new(&self.jurisdiction).map_err(|e| e.to_string())?;
        let start = Timestamp::parse_lenient(&self.start_date_time)
            .map_err(|e| format!("invalid startDateTime: {e}"))?;
        let end = Timestamp::parse_lenient(&self.end_date_time)
            .map_err(|e| format!("invalid endDateTime: {e}"))?;
        if start >= end {
            return Err(format!(
                "startDateTime {start} must be before endDateTime {end}"
            ));
        }
        if end.signed_duration_since(start) > config.max_window() {
            return Err(format!(
                "window {start} to {end} exceeds the maximum of {} days",
                config.max_window_days
            ));
        }
        let continue_from = self
            .continue_from_provider_id
            .as_deref()
            .map(ProviderId::parse)
            .transpose()
            .map_err(|e| format!("invalid continueFromProviderId: {e}"))?;
        Ok(RollbackRequest {
            compact,
            jurisdiction,
            start,
            end,
            rollback_reason: self.rollback_reason.clone(),
            execution_name: self.execution_name.clone(),
            providers_processed: self.providers_processed,
            continue_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> RollbackInput {
        RollbackInput {
            compact: "aslp".to_string(),
            jurisdiction: "oh".to_string(),
            start_date_time: "2025-03-01T00:00:00Z".to_string(),
            end_date_time: "2025-03-02T00:00:00Z".to_string(),
            rollback_reason: "bad upload".to_string(),
            execution_name: "exec-1".to_string(),
            providers_processed: 0,
            continue_from_provider_id: None,
        }
    }

    #[test]
    fn test_valid_input() {
        let request = input().validate(&RollbackConfig::default()).unwrap();
        assert_eq!(request.jurisdiction.as_str(), "oh");
        assert!(request.contains(request.start));
        assert!(!request.contains(request.end));
    }

    #[test]
    fn test_reversed_window_rejected() {
        let mut bad = input();
        bad.end_date_time = "2025-02-28T00:00:00Z".to_string();
        let err = bad.validate(&RollbackConfig::default()).unwrap_err();
        assert!(err.contains("must be before"));
    }

    #[test]
    fn test_window_over_maximum_rejected() {
        let mut bad = input();
        bad.end_date_time = "2025-03-08T00:00:01Z".to_string();
        let err = bad.validate(&RollbackConfig::default()).unwrap_err();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn test_exactly_max_window_allowed() {
        let mut ok = input();
        ok.end_date_time = "2025-03-08T00:00:00Z".to_string();
        assert!(ok.validate(&RollbackConfig::default()).is_ok());
    }

    #[test]
    fn test_unparseable_timestamp_rejected() {
        let mut bad = input();
        bad.start_date_time = "last tuesday".to_string();
        let err = bad.validate(&RollbackConfig::default()).unwrap_err();
        assert!(err.contains("startDateTime"));
    }

    #[test]
    fn test_empty_execution_name_rejected() {
        let mut bad = input();
        bad.execution_name = " ".to_string();
        let err = bad.validate(&RollbackConfig::default()).unwrap_err();
        assert!(err.contains("executionName"));
    }

    #[test]
    fn test_wire_names() {
        let parsed: RollbackInput = serde_json::from_value(json!({
            "compact": "aslp",
            "jurisdiction": "oh",
            "startDateTime": "2025-03-01T00:00:00Z",
            "endDateTime": "2025-03-02T00:00:00Z",
            "rollbackReason": "bad upload",
            "executionName": "exec-1"
        }))
        .unwrap();
        assert_eq!(parsed.providers_processed, 0);

        let output = RollbackOutput::failed(3, "nope");
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["rollbackStatus"], "FAILED");
        assert_eq!(value["providersProcessed"], 3);
        assert!(value.get("continueFromProviderId").is_none());
    }
}
