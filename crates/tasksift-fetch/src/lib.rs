//! Tasksift Fetch
//!
//! Pulls items from a paginated task-tracker API under rate limiting and
//! transient failures.
//!
//! # Overview
//!
//! A run fans out over fetch dimensions (day × owner × subunit flag). Each
//! dimension is fetched to completion by a [`PagedFetcher`], which follows
//! continuation tokens, paces successive pages and retries rate-limit and
//! server errors within a fixed attempt budget. The per-dimension results are
//! then merged by item id, last write winning.
//!
//! # Architecture
//!
//! ```text
//! FetchPlan → [FetchQuery] → fetch_dimensions → PagedFetcher → ItemSource
//!                                   ↓
//!                             merge_items → Items by id
//! ```
//!
//! # Example Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use tasksift_domain::{FetchQuery, Item};
//! use tasksift_fetch::{FetchConfig, MockSource, PagedFetcher};
//!
//! # async fn example() -> Result<(), tasksift_fetch::FetchError> {
//! let day = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
//! let source = MockSource::new(vec![Item::new("1", "Draft copy").with_due(day)]);
//! let fetcher = PagedFetcher::new(source, FetchConfig::default());
//!
//! let items = fetcher.fetch(&FetchQuery::for_day(day)).await?;
//! assert_eq!(items.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod fetcher;
mod http;
mod merge;
mod mock;
mod plan;
mod pool;

pub use config::FetchConfig;
pub use error::FetchError;
pub use fetcher::PagedFetcher;
pub use http::{item_from_task, AsanaSource, DEFAULT_BASE_URL, DEFAULT_OPT_FIELDS};
pub use merge::{merge_into, merge_items};
pub use mock::MockSource;
pub use plan::{days_inclusive, week_bounds, FetchPlan, Owner};
pub use pool::{fetch_dimensions, FetchOutcome, OWNER_LABEL_ATTRIBUTE};
