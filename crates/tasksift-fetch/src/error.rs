//! Error types for the fetch layer

use thiserror::Error;

/// Errors surfaced by the fetch layer.
///
/// Both variants are fatal for the query that produced them only; callers
/// fetching several dimensions keep going with the others.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Permanent (non-retryable) failure from the remote API
    #[error("Remote error for {query}: HTTP {status}: {message}")]
    Remote {
        /// The query that failed
        query: String,
        /// HTTP status
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Rate-limit or transient failures outlasted the attempt budget
    #[error("Retries exhausted for {query} after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// The query that failed
        query: String,
        /// Requests issued for the failing page
        attempts: u32,
        /// Last failure seen
        last: String,
    },

    /// Invalid configuration or client setup
    #[error("Configuration error: {0}")]
    Config(String),
}

impl FetchError {
    /// HTTP status of the failure, when one is known
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
