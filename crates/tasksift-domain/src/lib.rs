//! Tasksift Domain Layer
//!
//! Core data model and collaborator interfaces for the tasksift pipeline.
//! Every other crate in the workspace depends on these types; this crate
//! performs no I/O of its own.
//!
//! ## Key Concepts
//!
//! - **Item**: A unit of work pulled from the remote task tracker
//! - **FetchQuery**: One fetch dimension (day × owner × subunit flag)
//! - **ClassificationResult**: Classifier output correlated to one item
//! - **RunId**: UUIDv7 identifier stamped on every pipeline run
//!
//! ## Architecture
//!
//! - Plain data types with serde support
//! - Trait definitions for the three external collaborators
//!   (item source, classifier, report sink)
//! - Implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classification;
pub mod item;
pub mod query;
pub mod run;
pub mod traits;

// Re-exports for convenience
pub use classification::ClassificationResult;
pub use item::Item;
pub use query::{Continuation, FetchQuery, SearchPage, SearchRequest, SortOrder, SourceResponse};
pub use run::RunId;
