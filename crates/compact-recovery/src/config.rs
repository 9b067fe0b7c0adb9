//! Rollback configuration.
//!
//! The scheduler's own execution limit is not part of this configuration:
//! a provider is never interrupted once started, so the only budget the
//! engine can act on is the soft cutoff checked between providers. Set it
//! far enough below the scheduler limit to cover one provider plus the
//! results save. Loaded from environment variables or a YAML document;
//! both paths validate.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use compact_state::model::keys::LICENSE_JURISDICTION_INDEX;

/// File name of the per-execution results document.
pub const RESULTS_FILE_NAME: &str = "rollback-results.json";

/// Rollback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RollbackConfig {
    /// Stop taking new providers once this much time has elapsed.
    pub soft_cutoff_secs: u64,
    /// Longest window a rollback may cover.
    pub max_window_days: u32,
    /// Page size of the provider scan.
    pub scan_page_size: usize,
    /// Index keyed by `{compact}#JURISDICTION#{jurisdiction}`.
    pub license_jurisdiction_index: String,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            soft_cutoff_secs: 12 * 60,
            max_window_days: 7,
            scan_page_size: 100,
            license_jurisdiction_index: LICENSE_JURISDICTION_INDEX.to_string(),
        }
    }
}

impl RollbackConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ROLLBACK_SOFT_CUTOFF_SECS` (default: 720)
    /// - `ROLLBACK_MAX_WINDOW_DAYS` (default: 7)
    /// - `ROLLBACK_SCAN_PAGE_SIZE` (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            soft_cutoff_secs: env_number("ROLLBACK_SOFT_CUTOFF_SECS", defaults.soft_cutoff_secs)?,
            max_window_days: env_number("ROLLBACK_MAX_WINDOW_DAYS", defaults.max_window_days)?,
            scan_page_size: env_number("ROLLBACK_SCAN_PAGE_SIZE", defaults.scan_page_size)?,
            license_jurisdiction_index: defaults.license_jurisdiction_index,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document. Absent keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.soft_cutoff_secs == 0 {
            return Err(ConfigError::Invalid(
                "softCutoffSecs".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.max_window_days == 0 {
            return Err(ConfigError::Invalid(
                "maxWindowDays".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.scan_page_size == 0 {
            return Err(ConfigError::Invalid(
                "scanPageSize".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if self.license_jurisdiction_index.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "licenseJurisdictionIndex".to_string(),
                "must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn soft_cutoff(&self) -> Duration {
        Duration::seconds(i64::try_from(self.soft_cutoff_secs).unwrap_or(i64::MAX))
    }

    pub fn max_window(&self) -> Duration {
        Duration::days(i64::from(self.max_window_days))
    }

    /// Object key of the results document for one execution.
    pub fn results_key(&self, execution_name: &str) -> String {
        format!("{execution_name}/{RESULTS_FILE_NAME}")
    }
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(var.to_string(), format!("{raw:?} is not a number"))),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),

    #[error("invalid rollback configuration: {0}")]
    Yaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RollbackConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.soft_cutoff(), Duration::minutes(12));
        assert_eq!(cfg.max_window(), Duration::days(7));
    }

    #[test]
    fn test_yaml_overrides_some_fields() {
        let cfg = RollbackConfig::from_yaml_str("softCutoffSecs: 60\nscanPageSize: 5\n").unwrap();
        assert_eq!(cfg.soft_cutoff_secs, 60);
        assert_eq!(cfg.scan_page_size, 5);
        assert_eq!(cfg.max_window_days, 7);
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        let err = RollbackConfig::from_yaml_str("softCutof: 60\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_zero_soft_cutoff_rejected() {
        let err = RollbackConfig::from_yaml_str("softCutoffSecs: 0\n").unwrap_err();
        assert!(err.to_string().contains("softCutoffSecs"));
    }

    #[test]
    fn test_scheduler_limit_is_not_a_setting() {
        let err = RollbackConfig::from_yaml_str("hardLimitSecs: 900\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let cfg = RollbackConfig {
            scan_page_size: 0,
            ..RollbackConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_results_key_layout() {
        let cfg = RollbackConfig::default();
        assert_eq!(
            cfg.results_key("exec-42"),
            "exec-42/rollback-results.json"
        );
    }
}
