//! Configuration for the batch classifier

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the adaptive batch classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum items per top-level batch
    pub batch_size: usize,

    /// Batches at or below this size are salvaged instead of split
    pub min_batch: usize,

    /// Wall-clock limit for a single classifier call (seconds)
    pub timeout_secs: u64,

    /// Classifier calls in flight at once, across all batches and splits
    pub max_in_flight: usize,

    /// Deepest split allowed below a top-level batch
    pub max_split_depth: u32,
}

impl ClassifierConfig {
    /// Get the per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.min_batch == 0 {
            return Err("min_batch must be at least 1".to_string());
        }
        if self.min_batch > self.batch_size {
            return Err("min_batch cannot exceed batch_size".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ClassifierConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            batch_size: 70,
            min_batch: 5,
            timeout_secs: 600,
            max_in_flight: 4,
            max_split_depth: 8,
        }
    }
}

impl ClassifierConfig {
    /// Aggressive preset: smaller batches, shorter timeouts, more parallelism
    pub fn aggressive() -> Self {
        Self {
            batch_size: 40,
            min_batch: 3,
            timeout_secs: 180,
            max_in_flight: 8,
            max_split_depth: 6,
        }
    }

    /// Lenient preset: larger batches and more patience per call
    pub fn lenient() -> Self {
        Self {
            batch_size: 80,
            min_batch: 10,
            timeout_secs: 900,
            max_in_flight: 2,
            max_split_depth: 8,
        }
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
