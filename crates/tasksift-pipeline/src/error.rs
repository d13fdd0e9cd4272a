//! Error types for pipeline runs

use std::path::PathBuf;
use tasksift_classifier::ClassifierError;
use tasksift_filter::FilterError;
use thiserror::Error;

/// Errors that can stop a pipeline run
///
/// Partial fetch failures, validation failures and salvage are not errors;
/// they are reported in [`crate::RunMetrics`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Container filter rejected its configuration
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Classifier setup failed
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Every fetch dimension failed
    #[error("All {queries} fetch dimensions failed; first error: {first}")]
    FetchFailed {
        /// Dimensions attempted
        queries: usize,
        /// First failure
        first: String,
    },

    /// Artifact I/O failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Artifact (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The report sink refused the results
    #[error("Report sink error: {0}")]
    Sink(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
