//! Configuration for pipeline runs
//!
//! One struct per component, gathered into a single TOML document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tasksift_classifier::ClassifierConfig;
use tasksift_fetch::{FetchConfig, Owner};
use tasksift_filter::FilterConfig;
use tasksift_llm::AssistantConfig;

/// Longest allowed watch interval: one week
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Weekly capacity per owner label, for workload assessment
///
/// # Examples
///
/// ```
/// use tasksift_pipeline::CapacityConfig;
///
/// let mut capacity = CapacityConfig::default();
/// capacity.owners.insert("Alex".to_string(), 600.0);
///
/// assert_eq!(capacity.minutes_for("Alex"), 600.0);
/// assert_eq!(capacity.minutes_for("Sam"), 1200.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityConfig {
    /// Minutes per week for owners without their own entry
    pub default_minutes: f64,

    /// Minutes per week by owner label
    pub owners: BTreeMap<String, f64>,
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            default_minutes: 1200.0,
            owners: BTreeMap::new(),
        }
    }
}

impl CapacityConfig {
    /// Weekly capacity for `owner`
    pub fn minutes_for(&self, owner: &str) -> f64 {
        self.owners
            .get(owner)
            .copied()
            .unwrap_or(self.default_minutes)
    }

    /// Capacities must be positive and finite
    pub fn validate(&self) -> Result<(), String> {
        let valid = |minutes: f64| minutes.is_finite() && minutes > 0.0;
        if !valid(self.default_minutes) {
            return Err("default_minutes must be a positive number".to_string());
        }
        for (owner, minutes) in &self.owners {
            if !valid(*minutes) {
                return Err(format!("capacity for '{}' must be a positive number", owner));
            }
        }
        Ok(())
    }
}

/// Configuration for a pipeline run and the periodic worker
///
/// # Examples
///
/// ```
/// use tasksift_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.week_offset, 0);
/// assert_eq!(config.classifier.batch_size, 70);
///
/// let config = PipelineConfig::aggressive();
/// assert!(config.interval_minutes < PipelineConfig::default().interval_minutes);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Week to report on relative to the current one (-1 = last week)
    pub week_offset: i64,

    /// Directory for run artifacts; `None` disables them
    pub output_dir: Option<PathBuf>,

    /// Free-form classification instructions file
    pub instructions_path: Option<PathBuf>,

    /// Rules JSON file handed to the classifier verbatim
    pub rules_path: Option<PathBuf>,

    /// Minutes between runs in watch mode
    pub interval_minutes: u64,

    /// Owners to fetch for, each with a friendly label
    pub owners: Vec<Owner>,

    /// Weekly capacity by owner label
    pub capacity: CapacityConfig,

    /// Remote fetch settings
    pub fetch: FetchConfig,

    /// Container filter settings
    pub filter: FilterConfig,

    /// Batch classification settings
    pub classifier: ClassifierConfig,

    /// Assistant collaborator settings
    pub assistant: AssistantConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            owners: Vec::new(),
            capacity: CapacityConfig::default(),
            week_offset: 0,
            output_dir: Some(PathBuf::from("runs")),
            instructions_path: None,
            rules_path: None,
            interval_minutes: 60,
            fetch: FetchConfig::default(),
            filter: FilterConfig::default(),
            classifier: ClassifierConfig::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Smaller batches, shorter deadlines and more frequent runs
    pub fn aggressive() -> Self {
        Self {
            interval_minutes: 30,
            fetch: FetchConfig::aggressive(),
            classifier: ClassifierConfig::aggressive(),
            ..Default::default()
        }
    }

    /// Patient retries, long deadlines and infrequent runs
    pub fn lenient() -> Self {
        Self {
            interval_minutes: 120,
            fetch: FetchConfig::lenient(),
            classifier: ClassifierConfig::lenient(),
            ..Default::default()
        }
    }

    /// Interval between runs in watch mode
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), String> {
        if self.interval_minutes == 0 {
            return Err("interval_minutes must be at least 1".to_string());
        }
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(format!(
                "interval_minutes must be at most {}",
                MAX_INTERVAL_MINUTES
            ));
        }
        for owner in &self.owners {
            if owner.id.trim().is_empty() {
                return Err(format!("owner '{}' has an empty id", owner.label));
            }
        }
        self.capacity
            .validate()
            .map_err(|e| format!("[capacity] {}", e))?;
        self.fetch.validate().map_err(|e| format!("[fetch] {}", e))?;
        self.filter
            .validate()
            .map_err(|e| format!("[filter] {}", e))?;
        self.classifier
            .validate()
            .map_err(|e| format!("[classifier] {}", e))?;
        Ok(())
    }

    /// Load from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!(config.owners.is_empty());
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(config.output_dir, Some(PathBuf::from("runs")));
        assert!(!config.filter.include_containers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(PipelineConfig::aggressive().classifier.batch_size, 40);
        assert_eq!(PipelineConfig::lenient().interval_minutes, 120);
        assert!(PipelineConfig::aggressive().validate().is_ok());
        assert!(PipelineConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_from_toml_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            week_offset = -1
            interval_minutes = 15

            [[owners]]
            label = "Alex"
            id = "1203"

            [capacity]
            default_minutes = 900

            [capacity.owners]
            Alex = 600

            [fetch]
            page_size = 50

            [filter]
            include_containers = true

            [classifier]
            batch_size = 30
            min_batch = 3

            [assistant]
            assistant_id = "asst_123"
            "#,
        )
        .unwrap();

        assert_eq!(config.week_offset, -1);
        assert_eq!(config.owners, vec![Owner::new("Alex", "1203")]);
        assert_eq!(config.capacity.minutes_for("Alex"), 600.0);
        assert_eq!(config.capacity.minutes_for("Sam"), 900.0);
        assert_eq!(config.fetch.page_size, 50);
        assert_eq!(config.fetch.max_attempts, 5);
        assert!(config.filter.include_containers);
        assert_eq!(config.classifier.batch_size, 30);
        assert_eq!(config.assistant.assistant_id, "asst_123");
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let err = PipelineConfig::from_toml("[classifier]\nmin_batch = 0\n").unwrap_err();
        assert!(err.contains("[classifier]"));

        let err = PipelineConfig::from_toml("interval_minutes = 0\n").unwrap_err();
        assert!(err.contains("interval_minutes"));

        let err = PipelineConfig::from_toml("[capacity.owners]\nAlex = 0\n").unwrap_err();
        assert!(err.contains("[capacity]"));

        let err = PipelineConfig::from_toml("[[owners]]\nlabel = \"X\"\nid = \" \"\n").unwrap_err();
        assert!(err.contains("empty id"));
    }

    #[test]
    fn test_interval_bounded() {
        let mut config = PipelineConfig::default();
        config.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());
        assert_eq!(config.interval(), Duration::from_secs(7 * 24 * 3600));

        config.interval_minutes = u64::MAX;
        assert!(config.validate().unwrap_err().contains("at most"));
        assert_eq!(config.interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::default();
        config.owners.push(Owner::new("Sam", "42"));
        config.capacity.owners.insert("Sam".to_string(), 480.0);
        let text = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.owners, config.owners);
        assert_eq!(parsed.capacity, config.capacity);
        assert_eq!(parsed.classifier.batch_size, config.classifier.batch_size);
    }
}
