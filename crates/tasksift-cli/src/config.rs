//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tasksift_pipeline::PipelineConfig;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Display settings
    #[serde(default)]
    pub settings: Settings,

    /// Pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".tasksift").join("config.toml"))
    }

    /// Resolve an explicit path or fall back to the default.
    pub fn resolve(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = Self::resolve(path)?;

        if !resolved.exists() {
            if path.is_some() {
                return Err(CliError::Config(format!(
                    "Config file not found: {}",
                    resolved.display()
                )));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&resolved)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.pipeline.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert_eq!(config.pipeline.classifier.batch_size, 70);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.settings.format = OutputFormat::Json;
        config.pipeline.week_offset = -1;
        config.save(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.settings.format, OutputFormat::Json);
        assert_eq!(loaded.pipeline.week_offset, -1);
    }

    #[test]
    fn test_missing_explicit_path() {
        let result = Config::load(Some(Path::new("/nonexistent/tasksift.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_sections_parse() {
        let config = Config::from_toml(
            r#"
            [settings]
            color = false
            format = "quiet"

            [pipeline]
            week_offset = -1

            [[pipeline.owners]]
            label = "Alex"
            id = "1203"

            [pipeline.classifier]
            batch_size = 40
            "#,
        )
        .unwrap();

        assert!(!config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Quiet);
        assert_eq!(config.pipeline.owners.len(), 1);
        assert_eq!(config.pipeline.classifier.batch_size, 40);
    }

    #[test]
    fn test_invalid_pipeline_rejected() {
        let result = Config::from_toml("[pipeline.classifier]\nmin_batch = 0\n");
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
