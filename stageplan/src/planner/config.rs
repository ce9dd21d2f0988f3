//! Planner configuration.

use crate::errors::StageplanError;
use serde::{Deserialize, Serialize};

/// Configuration for DAG planning.
///
/// The planner never reads files or the environment; callers pass this in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Whether to schedule the stages downstream of the model selector.
    pub plan_after_selector: bool,
    /// Whether successful cuts are memoised by graph fingerprint.
    pub cache_plans: bool,
    /// Whether each cut is summarised at info level (debug otherwise).
    pub log_summary: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            plan_after_selector: true,
            cache_plans: false,
            log_summary: true,
        }
    }
}

impl PlannerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether post-selector stages are scheduled.
    #[must_use]
    pub const fn with_after_selector(mut self, enabled: bool) -> Self {
        self.plan_after_selector = enabled;
        self
    }

    /// Sets whether cuts are cached.
    #[must_use]
    pub const fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_plans = enabled;
        self
    }

    /// Sets whether cut summaries are logged at info level.
    #[must_use]
    pub const fn with_log_summary(mut self, enabled: bool) -> Self {
        self.log_summary = enabled;
        self
    }

    /// Parses a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, StageplanError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PlannerConfig::default();
        assert!(config.plan_after_selector);
        assert!(!config.cache_plans);
        assert!(config.log_summary);
    }

    #[test]
    fn test_config_builder() {
        let config = PlannerConfig::new()
            .with_after_selector(false)
            .with_cache(true)
            .with_log_summary(false);

        assert!(!config.plan_after_selector);
        assert!(config.cache_plans);
        assert!(!config.log_summary);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = PlannerConfig::from_json(r#"{"cache_plans": true}"#).unwrap();
        assert!(config.cache_plans);
        assert!(config.plan_after_selector);
    }

    #[test]
    fn test_config_from_invalid_json() {
        let err = PlannerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, StageplanError::Serialization(_)));
    }
}
