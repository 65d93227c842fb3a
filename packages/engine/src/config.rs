//! Engine configuration.
//!
//! Loaded from a TOML file; every key is optional and falls back to the
//! defaults below. `POLARIS_API_URL` overrides `api_base_url` when set.
//!
//! ```toml
//! api_base_url = "http://10.0.0.12:8000"
//! poll_interval_secs = 5
//! override_policy = "suppress"
//! ```

use std::path::Path;
use std::time::Duration;

use polaris_feed::RetryPolicy;
use serde::Deserialize;

use crate::EngineError;
use crate::priority::{OverridePolicy, PriorityRules};

/// Environment variable that overrides [`EngineConfig::api_base_url`].
pub const API_URL_ENV: &str = "POLARIS_API_URL";

/// Runtime settings for the engine and its feed client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Root URL of the feed API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Seconds between periodic refresh cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Re-sends of a failed request within one fetch.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first re-send, in milliseconds.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Minimum risk score (inclusive) for a point to become a target.
    #[serde(default = "default_priority_threshold")]
    pub priority_threshold: f64,
    /// How many nearby safe zones to list with a target.
    #[serde(default = "default_nearest_safe_zone_count")]
    pub nearest_safe_zone_count: usize,
    /// Whether targeting runs during a manual override.
    #[serde(default)]
    pub override_policy: OverridePolicy,
    /// Author recorded on overrides that do not name one.
    #[serde(default = "default_override_author")]
    pub override_author: String,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

const fn default_poll_interval_secs() -> u64 {
    5
}

const fn default_request_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    1
}

const fn default_retry_base_delay_ms() -> u64 {
    250
}

const fn default_priority_threshold() -> f64 {
    crate::priority::PRIORITY_THRESHOLD
}

const fn default_nearest_safe_zone_count() -> usize {
    crate::priority::NEAREST_SAFE_ZONE_COUNT
}

fn default_override_author() -> String {
    "Authority Dashboard".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            priority_threshold: default_priority_threshold(),
            nearest_safe_zone_count: default_nearest_safe_zone_count(),
            override_policy: OverridePolicy::default(),
            override_author: default_override_author(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigParse`] for malformed TOML and
    /// [`EngineError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: Self = toml::de::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ConfigRead`] if the file cannot be read, or
    /// any error from [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        log::info!("Loading engine config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&text)?.with_env_overrides())
    }

    /// Applies `POLARIS_API_URL` if it is set and non-empty.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = std::env::var(API_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
        {
            log::info!("Using {API_URL_ENV}={url}");
            self.api_base_url = url;
        }
        self
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first bad key.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.poll_interval_secs == 0 {
            return Err(EngineError::InvalidConfig {
                message: "poll_interval_secs must be at least 1".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(EngineError::InvalidConfig {
                message: "request_timeout_secs must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.priority_threshold) {
            return Err(EngineError::InvalidConfig {
                message: format!(
                    "priority_threshold must be within [0, 1], got {}",
                    self.priority_threshold
                ),
            });
        }
        Ok(())
    }

    /// Interval of the periodic refresh timer.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-request timeout for the feed client.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry policy for the feed client.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Targeting rules derived from this config.
    #[must_use]
    pub const fn priority_rules(&self) -> PriorityRules {
        PriorityRules {
            threshold: self.priority_threshold,
            nearest_count: self.nearest_safe_zone_count,
            override_policy: self.override_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.override_policy, OverridePolicy::Suppress);
        assert!((config.priority_threshold - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn reads_overrides_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            api_base_url = "http://feeds.local:9000/api"
            poll_interval_secs = 10
            override_policy = "compute_always"
            nearest_safe_zone_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "http://feeds.local:9000/api");
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.override_policy, OverridePolicy::ComputeAlways);
        assert_eq!(config.priority_rules().nearest_count, 3);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn rejects_zero_interval() {
        let err = EngineConfig::from_toml_str("poll_interval_secs = 0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let err = EngineConfig::from_toml_str("priority_threshold = 1.5").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_unknown_policy() {
        let err = EngineConfig::from_toml_str(r#"override_policy = "sometimes""#).unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }

    #[test]
    fn retry_policy_uses_millis() {
        let config = EngineConfig::from_toml_str("max_retries = 2\nretry_base_delay_ms = 100").unwrap();
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
    }
}
