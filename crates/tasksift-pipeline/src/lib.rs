//! Tasksift Pipeline
//!
//! Orchestrates one run of the ingestion and classification pipeline and
//! repeats it on a schedule.
//!
//! # Overview
//!
//! A run:
//! - **Fetches** every (day, owner, subunit flag) dimension of the reporting
//!   week concurrently, merging by item id
//! - **Filters** container items out of the working set
//! - **Classifies** the rest in adaptive batches
//! - **Merges** results by id and hands the map to a [`ReportSink`]
//! - **Records** items, per-call audit records and the result map as
//!   artifacts, plus a [`RunMetrics`] summary
//!
//! # Architecture
//!
//! ```text
//! FetchPlan → fetch_dimensions → ContainerFilter → AdaptiveBatchClassifier
//!                  │                                        │
//!            items-*.jsonl                            audit-*.jsonl
//!                                                           │
//!                      ReportSink ← merge_results ←─────────┘
//!                  (classified-*.json, summary-*.txt)
//! ```
//!
//! A run with failed dimensions or salvaged batches still reports; it is
//! marked partial in the summary.
//!
//! # Usage
//!
//! ## One-time Run
//!
//! ```no_run
//! use chrono::Local;
//! use tasksift_fetch::AsanaSource;
//! use tasksift_llm::{AssistantClassifier, AssistantConfig};
//! use tasksift_pipeline::{ArtifactWriter, Pipeline, PipelineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let source = AsanaSource::new("workspace-gid", "asana-token", &config.fetch)?;
//! let classifier = AssistantClassifier::new("api-key", AssistantConfig::new("asst_123"))?;
//!
//! let pipeline = Pipeline::new(source, classifier, config)?;
//! let mut sink = ArtifactWriter::new("runs");
//! let report = pipeline.run(Local::now().date_naive(), &mut sink).await?;
//! println!("{}", report.metrics.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! week_offset = -1
//! output_dir = "runs"
//! interval_minutes = 60
//!
//! [[owners]]
//! label = "Alex"
//! id = "1203"
//!
//! [capacity]
//! default_minutes = 1200
//!
//! [capacity.owners]
//! Alex = 900
//!
//! [fetch]
//! page_size = 100
//! concurrency = 4
//!
//! [classifier]
//! batch_size = 70
//! min_batch = 5
//! timeout_secs = 600
//! ```

#![warn(missing_docs)]

mod artifacts;
mod config;
mod error;
mod metrics;
mod pipeline;
mod worker;

pub use artifacts::{read_items, ArtifactWriter, MemorySink};
pub use config::{CapacityConfig, PipelineConfig, MAX_INTERVAL_MINUTES};
pub use error::PipelineError;
pub use metrics::{LoadStatus, OwnerLoad, RunMetrics, NEAR_CAPACITY_RATIO, UNASSIGNED};
pub use pipeline::{ItemProcessor, Pipeline, RunReport};
pub use worker::PipelineWorker;

pub use tasksift_domain::traits::ReportSink;
