//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential was neither passed nor set in the environment
    #[error("Missing credential: pass --{flag} or set {env}")]
    MissingCredential {
        /// Command-line flag
        flag: &'static str,
        /// Environment variable
        env: &'static str,
    },

    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] tasksift_pipeline::PipelineError),

    /// Item source setup error
    #[error("Fetch error: {0}")]
    Fetch(#[from] tasksift_fetch::FetchError),

    /// Classifier setup error
    #[error("Classifier error: {0}")]
    Llm(#[from] tasksift_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
