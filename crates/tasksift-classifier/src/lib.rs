//! Tasksift Classifier
//!
//! Classifies items through an unreliable external collaborator, degrading
//! to partial results instead of failing.
//!
//! # Overview
//!
//! The collaborator is a black box whose output shape is unreliable at large
//! input sizes (truncation, length limits, stray commentary). Each batch is
//! submitted with an explicit structural requirement and the response is
//! accepted only if it parses and carries exactly one result per item.
//!
//! # Architecture
//!
//! ```text
//! Items → partition → [batch] → Classifier → validate ─ ok ──────→ results
//!                                    ↑            │
//!                                    └─ bisect ←──┤ failed, above floor
//!                                                 └ failed at floor → salvage
//!
//! results → merge_results → id → ClassificationResult
//! ```
//!
//! # Key Features
//!
//! - **Bounded batches**: at most `batch_size` items per call, input order kept
//! - **Adaptive splitting**: failed batches bisect at `floor(len/2)` down to `min_batch`
//! - **Salvage**: at the floor, any well-formed entries are kept, short or not
//! - **Audit trail**: every call's raw response is recorded
//! - **Bounded concurrency**: calls in flight capped across batches and splits
//!
//! # Example Usage
//!
//! ```
//! use tasksift_classifier::{merge_results, AdaptiveBatchClassifier, ClassifierConfig};
//! use tasksift_domain::Item;
//! use tasksift_llm::MockClassifier;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let classifier = AdaptiveBatchClassifier::new(MockClassifier::echo(), ClassifierConfig::default())?;
//!
//! let items = vec![Item::new("1", "Draft: lead story"), Item::new("2", "Edit copy")];
//! let run = classifier.classify(&items).await;
//!
//! assert!(run.is_complete());
//! let merged = merge_results(run.results);
//! println!("Classified {} items", merged.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod batching;
mod classifier;
mod config;
mod error;
mod merge;
mod parser;
mod prompt;
mod types;

#[cfg(test)]
mod tests;

pub use batching::{bisect, partition};
pub use classifier::AdaptiveBatchClassifier;
pub use config::ClassifierConfig;
pub use error::ClassifierError;
pub use merge::{merge_results, MergedResults};
pub use parser::{extract_json, salvage, validate};
pub use prompt::{structural_requirement, PromptBuilder};
pub use types::{BatchAudit, BatchOutcome, ClassificationRun, ValidationFailure};
