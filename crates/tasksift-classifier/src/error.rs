//! Error types for the classifier

use thiserror::Error;

/// Errors raised while setting up a classifier.
///
/// Classification itself never fails; these cover construction only.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt or rules file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Rules file is not valid JSON
    #[error("Invalid rules JSON: {0}")]
    Rules(String),
}

impl From<serde_json::Error> for ClassifierError {
    fn from(e: serde_json::Error) -> Self {
        ClassifierError::Rules(e.to_string())
    }
}
