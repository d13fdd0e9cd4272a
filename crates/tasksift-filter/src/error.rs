//! Filter error types

use thiserror::Error;

/// Errors that can occur while building a container filter
#[derive(Error, Debug)]
pub enum FilterError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed
    #[error("Failed to parse filter config: {0}")]
    Parse(#[from] toml::de::Error),
}
