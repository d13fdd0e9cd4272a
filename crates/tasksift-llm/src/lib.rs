//! Tasksift Classifier Collaborators
//!
//! Implementations of the [`Classifier`] trait from `tasksift-domain`.
//!
//! # Architecture
//!
//! A collaborator receives one batch of items plus instructions and returns
//! the raw text it produced. Shape validation, splitting and salvage happen in
//! `tasksift-classifier`; nothing here inspects the response.
//!
//! # Collaborators
//!
//! - `MockClassifier`: Deterministic mock for testing
//! - `AssistantClassifier`: OpenAI Assistants (v2) thread/run API
//!
//! # Examples
//!
//! ```
//! use tasksift_domain::traits::{Classifier, ClassifyRequest};
//! use tasksift_domain::Item;
//! use tasksift_llm::MockClassifier;
//!
//! # async fn example() {
//! let classifier = MockClassifier::new("{\"results\": []}");
//! let request = ClassifyRequest {
//!     items: vec![Item::new("1", "Draft copy")],
//!     instructions: "Classify".to_string(),
//! };
//! assert_eq!(classifier.submit(&request).await.unwrap(), "{\"results\": []}");
//! assert_eq!(classifier.call_sizes(), vec![1]);
//! # }
//! ```

#![warn(missing_docs)]

pub mod assistant;

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasksift_domain::traits::{Classifier, ClassifyRequest};
use thiserror::Error;

pub use assistant::{AssistantClassifier, AssistantConfig};

/// Errors that can occur while talking to a classifier
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response envelope from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The remote run ended in a non-success state
    #[error("Run {run_id} ended with status {status}: {detail}")]
    RunFailed {
        /// Run identifier
        run_id: String,
        /// Terminal status
        status: String,
        /// Last error reported by the API
        detail: String,
    },

    /// The remote run did not finish before the deadline
    #[error("Run {run_id} still {status} after {waited:?}")]
    DeadlineExceeded {
        /// Run identifier
        run_id: String,
        /// Last status seen
        status: String,
        /// Time spent polling
        waited: Duration,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Classifier error: {0}")]
    Other(String),
}

type Handler = dyn Fn(&ClassifyRequest) -> Result<String, LlmError> + Send + Sync;

/// Mock classifier for deterministic testing
///
/// Responses come from a handler over the request, so tests can make the
/// answer depend on batch size. Every call's batch size is recorded.
///
/// # Examples
///
/// ```
/// use tasksift_llm::MockClassifier;
///
/// // Valid for batches of up to three items, garbage above that
/// let classifier = MockClassifier::failing_above(3);
/// assert_eq!(classifier.call_count(), 0);
/// ```
#[derive(Clone)]
pub struct MockClassifier {
    handler: Arc<Handler>,
    calls: Arc<Mutex<Vec<usize>>>,
    delay: Option<Duration>,
}

impl MockClassifier {
    /// Create a mock returning a fixed response for every batch
    pub fn new(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::with_handler(move |_| Ok(response.clone()))
    }

    /// Create a mock answering through `handler`
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&ClassifyRequest) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Create a mock that answers every batch correctly
    pub fn echo() -> Self {
        Self::with_handler(|request| Ok(echo_response(request)))
    }

    /// Correct for batches of at most `limit` items, unparseable above
    pub fn failing_above(limit: usize) -> Self {
        Self::with_handler(move |request| {
            if request.items.len() > limit {
                Ok("I'm sorry, the list was too long to finish. {\"results\": [".to_string())
            } else {
                Ok(echo_response(request))
            }
        })
    }

    /// Create a mock that never returns structured data
    pub fn always_malformed() -> Self {
        Self::new("Here are your classifications: (output truncated)")
    }

    /// Create a mock whose every call fails
    pub fn always_error() -> Self {
        Self::with_handler(|_| Err(LlmError::Other("Mock error".to_string())))
    }

    /// Wait `delay` before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Batch sizes of every call so far, in call order
    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Get the number of times submit was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Reset the call log
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::echo()
    }
}

/// A well-formed response with one entry per item, in order
pub fn echo_response(request: &ClassifyRequest) -> String {
    let results: Vec<_> = request
        .items
        .iter()
        .map(|item| {
            json!({
                "id": item.id,
                "category": "Drafting",
                "type": "Article",
                "effort_minutes": 30
            })
        })
        .collect();
    json!({ "results": results }).to_string()
}

#[async_trait]
impl Classifier for MockClassifier {
    type Error = LlmError;

    async fn submit(&self, request: &ClassifyRequest) -> Result<String, Self::Error> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.items.len());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        (self.handler)(request)
    }
}
