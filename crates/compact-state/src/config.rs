//! Engine configuration.
//!
//! Defaults suit production. Override via environment variables or build
//! the struct directly in tests.

use crate::model::UpdateTierBound;

/// Default source tag on published events.
pub const DEFAULT_EVENT_SOURCE: &str = "org.compactconnect.provider-data";

/// Settings shared by the encumbrance and investigation engines.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Source tag attached to every published event.
    pub event_source: String,
    /// History included by provider views (not by engine decisions, which
    /// only read current state).
    pub history_bound: UpdateTierBound,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_source: DEFAULT_EVENT_SOURCE.to_string(),
            history_bound: UpdateTierBound::ALL,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `COMPACT_EVENT_SOURCE` (default: `org.compactconnect.provider-data`)
    /// - `COMPACT_MAX_UPDATE_TIER` (default: 3; 0 reads state only)
    pub fn from_env() -> Result<Self, ConfigError> {
        let event_source = std::env::var("COMPACT_EVENT_SOURCE")
            .unwrap_or_else(|_| DEFAULT_EVENT_SOURCE.to_string());
        if event_source.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "COMPACT_EVENT_SOURCE".to_string(),
                "must not be empty".to_string(),
            ));
        }
        let history_bound = match std::env::var("COMPACT_MAX_UPDATE_TIER") {
            Ok(raw) => parse_tier_bound("COMPACT_MAX_UPDATE_TIER", &raw)?,
            Err(_) => UpdateTierBound::ALL,
        };
        Ok(Self {
            event_source,
            history_bound,
        })
    }
}

fn parse_tier_bound(var: &str, raw: &str) -> Result<UpdateTierBound, ConfigError> {
    raw.trim()
        .parse::<u8>()
        .ok()
        .and_then(UpdateTierBound::from_number)
        .ok_or_else(|| ConfigError::Invalid(var.to_string(), format!("{raw:?} is not a tier 0-3")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}
