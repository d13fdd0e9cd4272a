//! Configuration for the fetch layer

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tasksift_domain::SortOrder;

/// Configuration for paginated fetching
///
/// All delays are in milliseconds so tests and presets can shrink them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Page size cap sent with every request
    pub page_size: u32,

    /// Sort order sent with every request
    pub sort: SortOrder,

    /// Maximum requests per page before giving up (rate-limit and 5xx alike)
    pub max_attempts: u32,

    /// First backoff after a 5xx response
    pub initial_backoff_ms: u64,

    /// Backoff cap
    pub max_backoff_ms: u64,

    /// Rate-limit wait when the server does not advertise one
    pub default_retry_after_ms: u64,

    /// Lower bound on any rate-limit wait
    pub min_retry_after_ms: u64,

    /// Pause between successive page requests
    pub page_pacing_ms: u64,

    /// Fetch dimensions in flight at once
    pub concurrency: usize,

    /// Per-request HTTP timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            sort: SortOrder::DueDateAscending,
            max_attempts: 5,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            default_retry_after_ms: 2_000,
            min_retry_after_ms: 1_000,
            page_pacing_ms: 100,
            concurrency: 4,
            request_timeout_secs: 60,
        }
    }
}

impl FetchConfig {
    /// Aggressive preset: fewer attempts, shorter waits, more parallelism
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 4_000,
            page_pacing_ms: 50,
            concurrency: 8,
            request_timeout_secs: 30,
            ..Self::default()
        }
    }

    /// Lenient preset: more patience for a heavily loaded API
    pub fn lenient() -> Self {
        Self {
            max_attempts: 8,
            max_backoff_ms: 30_000,
            default_retry_after_ms: 5_000,
            page_pacing_ms: 250,
            concurrency: 2,
            request_timeout_secs: 120,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 {
            return Err("page_size must be greater than 0".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err("initial_backoff_ms cannot exceed max_backoff_ms".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// First 5xx backoff
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Backoff cap
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Wait to apply for a rate-limit response
    pub fn rate_limit_delay(&self, advertised: Option<Duration>) -> Duration {
        advertised
            .unwrap_or(Duration::from_millis(self.default_retry_after_ms))
            .max(Duration::from_millis(self.min_retry_after_ms))
    }

    /// Pause between pages
    pub fn page_pacing(&self) -> Duration {
        Duration::from_millis(self.page_pacing_ms)
    }

    /// HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(FetchConfig::default().validate().is_ok());
        assert!(FetchConfig::aggressive().validate().is_ok());
        assert!(FetchConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_backoff_range() {
        let config = FetchConfig {
            initial_backoff_ms: 20_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = FetchConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rate_limit_delay() {
        let config = FetchConfig::default();

        assert_eq!(config.rate_limit_delay(None), Duration::from_secs(2));
        assert_eq!(config.rate_limit_delay(Some(Duration::from_secs(7))), Duration::from_secs(7));
        // Advertised zero still waits the floor
        assert_eq!(config.rate_limit_delay(Some(Duration::ZERO)), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = FetchConfig::from_toml("page_size = 25\nmax_attempts = 3\n").unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.max_backoff_ms, 10_000);
    }
}
