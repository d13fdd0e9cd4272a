//! Run and audit types for batch classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasksift_domain::ClassificationResult;

/// Why a classifier response was not accepted as-is.
///
/// Always absorbed by split or salvage; surfaces only in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationFailure {
    /// No JSON could be found in the response
    NoStructuredData,

    /// JSON parsed but held no result array
    MissingResults,

    /// Result array length differs from the batch size
    CountMismatch {
        /// Batch size
        expected: usize,
        /// Entries returned
        actual: usize,
    },

    /// An entry could not be read as a result
    MalformedEntry {
        /// Position in the array
        index: usize,
        /// Parse error
        reason: String,
    },

    /// The call exceeded its deadline
    Timeout {
        /// Deadline that was exceeded (seconds)
        limit_secs: u64,
    },

    /// The classifier returned an error instead of text
    Classifier {
        /// Error message
        message: String,
    },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::NoStructuredData => write!(f, "no structured data"),
            ValidationFailure::MissingResults => write!(f, "no result array"),
            ValidationFailure::CountMismatch { expected, actual } => {
                write!(f, "expected {} results, got {}", expected, actual)
            }
            ValidationFailure::MalformedEntry { index, reason } => {
                write!(f, "entry {} malformed: {}", index, reason)
            }
            ValidationFailure::Timeout { limit_secs } => {
                write!(f, "timed out after {}s", limit_secs)
            }
            ValidationFailure::Classifier { message } => write!(f, "classifier error: {}", message),
        }
    }
}

/// What happened to a batch after its classifier call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Response validated; one result per item
    Validated,
    /// Validation failed; the batch was split in two
    Split,
    /// Validation failed at the floor; partial results kept
    Salvaged,
}

/// Audit record for one classifier call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAudit {
    /// Index of the first item in the run's input
    pub start: usize,
    /// Items in the batch
    pub size: usize,
    /// Split depth below the top-level batch
    pub depth: u32,
    /// Ids submitted, in order
    pub item_ids: Vec<String>,
    /// Outcome of the call
    pub outcome: BatchOutcome,
    /// Validation failure, when there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ValidationFailure>,
    /// Results kept from this call
    pub recovered: usize,
    /// Raw response text, when the classifier returned any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    /// When the call completed
    pub timestamp: DateTime<Utc>,
    /// Call duration in milliseconds
    pub elapsed_ms: u64,
}

impl BatchAudit {
    /// Whether this call lost items (salvaged short of the batch size)
    pub fn lost_items(&self) -> usize {
        match self.outcome {
            BatchOutcome::Salvaged => self.size.saturating_sub(self.recovered),
            _ => 0,
        }
    }
}

/// Result of classifying a set of items
#[derive(Debug, Clone, Default)]
pub struct ClassificationRun {
    /// Results in input order (left halves before right halves)
    pub results: Vec<ClassificationResult>,
    /// One record per classifier call, ordered by batch position then depth
    pub audits: Vec<BatchAudit>,
    /// Items submitted
    pub items: usize,
    /// Top-level batches
    pub batches: usize,
    /// Scheduler tasks that ended abnormally
    pub lost_tasks: usize,
}

impl ClassificationRun {
    /// Classifier calls made
    pub fn calls(&self) -> usize {
        self.audits.len()
    }

    /// Splits performed
    pub fn splits(&self) -> usize {
        self.count(BatchOutcome::Split)
    }

    /// Salvage events
    pub fn salvaged(&self) -> usize {
        self.count(BatchOutcome::Salvaged)
    }

    /// Items with no validated result
    pub fn lost_items(&self) -> usize {
        self.audits.iter().map(BatchAudit::lost_items).sum()
    }

    /// Whether every batch validated without salvage
    pub fn is_complete(&self) -> bool {
        self.lost_tasks == 0 && self.salvaged() == 0
    }

    fn count(&self, outcome: BatchOutcome) -> usize {
        self.audits.iter().filter(|a| a.outcome == outcome).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audit(outcome: BatchOutcome, size: usize, recovered: usize) -> BatchAudit {
        BatchAudit {
            start: 0,
            size,
            depth: 0,
            item_ids: Vec::new(),
            outcome,
            failure: None,
            recovered,
            raw_response: None,
            timestamp: Utc::now(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_run_counts() {
        let run = ClassificationRun {
            audits: vec![
                audit(BatchOutcome::Split, 10, 0),
                audit(BatchOutcome::Validated, 5, 5),
                audit(BatchOutcome::Salvaged, 5, 2),
            ],
            ..Default::default()
        };

        assert_eq!(run.calls(), 3);
        assert_eq!(run.splits(), 1);
        assert_eq!(run.salvaged(), 1);
        assert_eq!(run.lost_items(), 3);
        assert!(!run.is_complete());
    }

    #[test]
    fn test_empty_run_is_complete() {
        assert!(ClassificationRun::default().is_complete());
    }

    #[test]
    fn test_failure_serializes_with_kind_tag() {
        let failure = ValidationFailure::CountMismatch {
            expected: 4,
            actual: 3,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "count_mismatch");
        assert_eq!(failure.to_string(), "expected 4 results, got 3");
    }
}
