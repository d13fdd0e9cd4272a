//! Container filter configuration

use crate::FilterError;
use serde::{Deserialize, Serialize};

/// Word lists and toggles for the container heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Keep containers in the working set instead of dropping them
    pub include_containers: bool,

    /// Terms marking a title as actionable (case-insensitive).
    ///
    /// A term matches where it starts at a word boundary; a term ending in a
    /// letter or digit must also end at one.
    pub action_terms: Vec<String>,

    /// Whole words that, together with a bar-segmented title, mark a container
    pub structural_markers: Vec<String>,

    /// Segment delimiter
    pub delimiter: char,

    /// Non-empty segments required for a segmented title
    pub min_segments: usize,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_containers: false,
            action_terms: words(&[
                "draft",
                "drafting",
                "edit",
                "editing",
                "editor:",
                "writer:",
                "publish",
                "published",
                "publishing",
                "schedule",
                "scheduled",
                "scheduling",
                "plan",
                "planner:",
                "planning",
                "ready",
                "preview link sent",
                "send to client",
                "sent to press",
            ]),
            structural_markers: words(&["runs", "posted"]),
            delimiter: '|',
            min_segments: 2,
        }
    }
}

impl FilterConfig {
    /// Default word lists, containers kept
    pub fn including_containers() -> Self {
        Self {
            include_containers: true,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.delimiter.is_alphanumeric() || self.delimiter.is_whitespace() {
            return Err(FilterError::Config(format!(
                "delimiter '{}' must be a punctuation character",
                self.delimiter
            )));
        }
        if self.min_segments < 2 {
            return Err(FilterError::Config(
                "min_segments must be at least 2".to_string(),
            ));
        }
        if self.structural_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(FilterError::Config(
                "structural_markers cannot contain empty entries".to_string(),
            ));
        }
        if self.action_terms.iter().any(|t| t.trim().is_empty()) {
            return Err(FilterError::Config(
                "action_terms cannot contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, FilterError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}
