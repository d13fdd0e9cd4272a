//! Tasksift Filter
//!
//! Removes non-actionable grouping items ("containers") from the working set
//! before classification.
//!
//! A container is a parent item whose real work lives in its children, such
//! as a bar-segmented newsletter title that "runs" on a date. The rule:
//! - subunits and untitled items are never containers
//! - an action term in the title overrides everything else
//! - a bar-segmented title with a structural marker word is a container
//! - anything else is not
//!
//! # Examples
//!
//! ```
//! use tasksift_domain::Item;
//! use tasksift_filter::{ContainerFilter, FilterConfig};
//!
//! let filter = ContainerFilter::new(FilterConfig::default()).unwrap();
//!
//! assert!(filter.is_container(&Item::new("1", "Acme | Weekly Digest runs 5/1 | NYC")));
//! assert!(!filter.is_container(&Item::new("2", "Draft: Acme | Weekly Digest runs 5/1")));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod filter;

pub use config::FilterConfig;
pub use error::FilterError;
pub use filter::{ContainerFilter, FilterOutcome, Verdict};
