//! Typed pipeline configuration.
//!
//! The core consumes a closed set of recognized options; unknown keys are
//! rejected at parse time rather than silently ignored.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Prefix for per-stage timeout keys in a configuration map.
const STAGE_TIMEOUT_PREFIX: &str = "stage_timeout.";

/// Configuration consumed by the orchestration core at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum acceptable coverage percentage for the coverage gate.
    pub coverage_threshold: u32,

    /// Maximum number of critical findings the vulnerability gate tolerates.
    pub critical_vulnerability_limit: u32,

    /// Key identifiers the signature gate trusts.
    pub trusted_signing_keys: HashSet<String>,

    /// Per-stage executor deadlines, in seconds.
    pub stage_timeouts: HashMap<String, u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 80,
            critical_vulnerability_limit: 0,
            trusted_signing_keys: HashSet::new(),
            stage_timeouts: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coverage threshold.
    #[must_use]
    pub fn with_coverage_threshold(mut self, threshold: u32) -> Self {
        self.coverage_threshold = threshold;
        self
    }

    /// Sets the critical vulnerability limit.
    #[must_use]
    pub fn with_critical_vulnerability_limit(mut self, limit: u32) -> Self {
        self.critical_vulnerability_limit = limit;
        self
    }

    /// Adds a trusted signing key identifier.
    #[must_use]
    pub fn with_trusted_key(mut self, key_id: impl Into<String>) -> Self {
        self.trusted_signing_keys.insert(key_id.into());
        self
    }

    /// Sets the executor deadline for a stage, in seconds.
    #[must_use]
    pub fn with_stage_timeout(mut self, stage_id: impl Into<String>, seconds: u64) -> Self {
        self.stage_timeouts.insert(stage_id.into(), seconds);
        self
    }

    /// Returns the configured deadline for a stage, if any.
    #[must_use]
    pub fn stage_timeout(&self, stage_id: &str) -> Option<Duration> {
        self.stage_timeouts
            .get(stage_id)
            .copied()
            .map(Duration::from_secs)
    }

    /// Parses a configuration from a string map.
    ///
    /// Recognized keys: `coverage_threshold`, `critical_vulnerability_limit`,
    /// `trusted_signing_keys` (comma-separated), and `stage_timeout.<stage-id>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] for unrecognized keys and
    /// [`ConfigError::InvalidValue`] for values that fail to parse. Keys are
    /// checked in sorted order so the reported error is deterministic.
    pub fn from_map(options: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let mut keys: Vec<&String> = options.keys().collect();
        keys.sort();

        for key in keys {
            let value = &options[key];
            match key.as_str() {
                "coverage_threshold" => {
                    config.coverage_threshold = parse_u32(key, value)?;
                }
                "critical_vulnerability_limit" => {
                    config.critical_vulnerability_limit = parse_u32(key, value)?;
                }
                "trusted_signing_keys" => {
                    config.trusted_signing_keys = value
                        .split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(String::from)
                        .collect();
                }
                other => {
                    if let Some(stage_id) = other.strip_prefix(STAGE_TIMEOUT_PREFIX) {
                        let seconds = value.parse::<u64>().map_err(|_| {
                            ConfigError::InvalidValue {
                                key: key.clone(),
                                value: value.clone(),
                            }
                        })?;
                        config.stage_timeouts.insert(stage_id.to_string(), seconds);
                    } else {
                        return Err(ConfigError::UnknownKey { key: key.clone() });
                    }
                }
            }
        }

        Ok(config)
    }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.coverage_threshold, 80);
        assert_eq!(config.critical_vulnerability_limit, 0);
        assert!(config.trusted_signing_keys.is_empty());
    }

    #[test]
    fn test_from_map_recognized_keys() {
        let config = PipelineConfig::from_map(&map(&[
            ("coverage_threshold", "90"),
            ("critical_vulnerability_limit", "2"),
            ("trusted_signing_keys", "release-key, backup-key"),
            ("stage_timeout.build-image", "600"),
        ]))
        .unwrap();

        assert_eq!(config.coverage_threshold, 90);
        assert_eq!(config.critical_vulnerability_limit, 2);
        assert!(config.trusted_signing_keys.contains("release-key"));
        assert!(config.trusted_signing_keys.contains("backup-key"));
        assert_eq!(
            config.stage_timeout("build-image"),
            Some(Duration::from_secs(600))
        );
    }

    #[test]
    fn test_from_map_rejects_unknown_key() {
        let err = PipelineConfig::from_map(&map(&[("max_retries", "3")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownKey {
                key: "max_retries".to_string()
            }
        );
    }

    #[test]
    fn test_from_map_rejects_invalid_value() {
        let err =
            PipelineConfig::from_map(&map(&[("coverage_threshold", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_from_map_rejects_invalid_timeout() {
        let err =
            PipelineConfig::from_map(&map(&[("stage_timeout.deploy", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::new()
            .with_coverage_threshold(85)
            .with_trusted_key("release-key")
            .with_stage_timeout("deploy", 120);

        assert_eq!(config.coverage_threshold, 85);
        assert!(config.trusted_signing_keys.contains("release-key"));
        assert_eq!(config.stage_timeout("deploy"), Some(Duration::from_secs(120)));
        assert_eq!(config.stage_timeout("build"), None);
    }
}
