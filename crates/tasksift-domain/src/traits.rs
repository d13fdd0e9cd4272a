//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the pipeline core and the
//! services it talks to. Implementations live in other crates.

use crate::{ClassificationResult, Item, RunId, SearchRequest, SourceResponse};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Final classification output keyed by item id
pub type ClassifiedMap = BTreeMap<String, ClassificationResult>;

/// Remote paginated item source
///
/// Implemented by the fetch layer (tasksift-fetch). The source classifies
/// each raw response; retry policy belongs to the caller.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Request a single page
    async fn search(&self, request: &SearchRequest) -> SourceResponse;
}

/// Payload handed to the classifier for one batch
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    /// Items in submission order
    pub items: Vec<Item>,

    /// Instructions, including the structural requirement on the response
    pub instructions: String,
}

impl ClassifyRequest {
    /// Number of results the response must contain
    pub fn expected_count(&self) -> usize {
        self.items.len()
    }
}

/// External classification collaborator
///
/// Implemented by tasksift-llm. The returned text carries no guarantee of
/// being parseable or of having the right number of entries.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Error type for classifier operations
    type Error: std::fmt::Display + Send + Sync + 'static;

    /// Submit one batch and return the raw response text
    async fn submit(&self, request: &ClassifyRequest) -> Result<String, Self::Error>;
}

/// Destination for finished reports
///
/// Implemented by the pipeline layer (tasksift-pipeline)
pub trait ReportSink {
    /// Error type for sink operations
    type Error;

    /// Accept the merged result map for a run
    fn accept_results(&mut self, run_id: RunId, results: &ClassifiedMap) -> Result<(), Self::Error>;

    /// Accept a narrative summary for a run
    fn accept_narrative(&mut self, _run_id: RunId, _narrative: &str) -> Result<(), Self::Error> {
        Ok(())
    }
}
