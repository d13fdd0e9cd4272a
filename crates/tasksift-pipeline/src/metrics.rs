//! Metrics collected during a pipeline run

use crate::config::CapacityConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tasksift_classifier::{ClassificationRun, MergedResults};
use tasksift_domain::traits::ClassifiedMap;
use tasksift_domain::{Item, RunId};
use tasksift_fetch::{FetchOutcome, OWNER_LABEL_ATTRIBUTE};
use tasksift_filter::FilterOutcome;

/// Label used for results whose category or owner is unknown
pub const UNASSIGNED: &str = "Unassigned";

/// Load ratio from which an owner counts as near capacity
pub const NEAR_CAPACITY_RATIO: f64 = 0.85;

/// Where an owner stands against their weekly capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// More work than capacity
    Over,
    /// At or above the near-capacity ratio
    Near,
    /// Room for more work
    Available,
}

impl LoadStatus {
    fn from_ratio(ratio: f64) -> Self {
        if ratio > 1.0 {
            LoadStatus::Over
        } else if ratio >= NEAR_CAPACITY_RATIO {
            LoadStatus::Near
        } else {
            LoadStatus::Available
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Over => write!(f, "over capacity"),
            LoadStatus::Near => write!(f, "near capacity"),
            LoadStatus::Available => write!(f, "available"),
        }
    }
}

/// One owner's classified effort against their weekly capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerLoad {
    /// Owner label
    pub owner: String,
    /// Classified effort in minutes
    pub total_minutes: f64,
    /// Weekly capacity in minutes
    pub capacity_minutes: f64,
    /// Effort divided by capacity
    pub load_ratio: f64,
    /// Effort beyond capacity; negative when there is room to spare
    pub deficit_minutes: f64,
    /// Status derived from the load ratio
    pub status: LoadStatus,
}

/// Counters and tallies for one pipeline run
///
/// A run is `complete` only when every fetch dimension succeeded and every
/// batch validated without salvage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Run this summary belongs to
    pub run_id: Option<RunId>,

    /// Fetch dimensions attempted
    pub queries: usize,

    /// Fetch dimensions that failed
    pub failed_queries: usize,

    /// Items fetched before de-duplication
    pub fetched: usize,

    /// Items after de-duplication
    pub unique_items: usize,

    /// Containers detected by the filter
    pub containers: usize,

    /// Containers dropped before classification
    pub removed: usize,

    /// Items submitted for classification
    pub submitted: usize,

    /// Classifier calls made
    pub calls: usize,

    /// Batches split after a validation failure
    pub splits: usize,

    /// Batches salvaged at the minimum size
    pub salvaged: usize,

    /// Items left without a validated result
    pub lost_items: usize,

    /// Results dropped for lacking an id
    pub dropped_results: usize,

    /// Results in the final map
    pub classified: usize,

    /// Effort minutes by category
    pub effort_by_category: BTreeMap<String, f64>,

    /// Effort minutes by owner label
    pub effort_by_owner: BTreeMap<String, f64>,

    /// Owners against capacity, highest deficit first
    #[serde(default)]
    pub workload: Vec<OwnerLoad>,

    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,

    /// Whether nothing was lost anywhere in the run
    pub complete: bool,
}

impl RunMetrics {
    /// Create new empty metrics for `run_id`
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id: Some(run_id),
            ..Default::default()
        }
    }

    /// Record the fetch phase
    pub fn record_fetch(&mut self, outcome: &FetchOutcome) {
        self.queries = outcome.queries;
        self.failed_queries = outcome.failures.len();
        self.fetched = outcome.fetched;
        self.unique_items = outcome.items.len();
    }

    /// Record the filter phase
    pub fn record_filter(&mut self, outcome: &FilterOutcome) {
        self.containers = outcome.containers;
        self.removed = outcome.removed.len();
        self.submitted = outcome.kept.len();
    }

    /// Record the classification phase
    pub fn record_classification(&mut self, run: &ClassificationRun) {
        self.submitted = run.items;
        self.calls = run.calls();
        self.splits = run.splits();
        self.salvaged = run.salvaged();
        self.lost_items = run.lost_items();
    }

    /// Record the merged results and tally effort against `items`
    pub fn record_results(&mut self, merged: &MergedResults, items: &BTreeMap<String, Item>) {
        self.dropped_results = merged.dropped;
        self.classified = merged.len();
        self.tally_effort(&merged.results, items);
    }

    /// Add up effort minutes by category and by owner label.
    ///
    /// Results without an effort estimate are not counted.
    pub fn tally_effort(&mut self, results: &ClassifiedMap, items: &BTreeMap<String, Item>) {
        self.effort_by_category.clear();
        self.effort_by_owner.clear();

        for (id, result) in results {
            let Some(minutes) = result.effort_minutes else {
                continue;
            };
            let category = result.category.as_deref().unwrap_or(UNASSIGNED);
            *self
                .effort_by_category
                .entry(category.to_string())
                .or_insert(0.0) += minutes;

            let owner = items
                .get(id)
                .and_then(|item| item.attribute_str(OWNER_LABEL_ATTRIBUTE))
                .unwrap_or(UNASSIGNED);
            *self.effort_by_owner.entry(owner.to_string()).or_insert(0.0) += minutes;
        }
    }

    /// Rank owners by how far their effort exceeds capacity.
    ///
    /// Every label in `owners` is assessed, idle or not, along with any
    /// other owner that has tallied effort. Unassigned effort is left out.
    pub fn assess_workload<'a, I>(&mut self, owners: I, capacity: &CapacityConfig)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut totals: BTreeMap<&str, f64> = owners.into_iter().map(|o| (o, 0.0)).collect();
        for (owner, minutes) in &self.effort_by_owner {
            if owner != UNASSIGNED {
                totals.insert(owner.as_str(), *minutes);
            }
        }

        let mut workload: Vec<OwnerLoad> = totals
            .into_iter()
            .map(|(owner, total)| {
                let capacity_minutes = capacity.minutes_for(owner);
                let load_ratio = total / capacity_minutes;
                OwnerLoad {
                    owner: owner.to_string(),
                    total_minutes: total,
                    capacity_minutes,
                    load_ratio,
                    deficit_minutes: total - capacity_minutes,
                    status: LoadStatus::from_ratio(load_ratio),
                }
            })
            .collect();
        // Stable sort keeps owners with equal deficits in label order
        workload.sort_by(|a, b| b.deficit_minutes.total_cmp(&a.deficit_minutes));
        self.workload = workload;
    }

    /// Set the completion flag from the recorded counters
    pub fn finish(&mut self, lost_tasks: usize) {
        self.complete = self.failed_queries == 0 && self.salvaged == 0 && lost_tasks == 0;
    }

    /// Total effort minutes across categories
    pub fn total_effort(&self) -> f64 {
        self.effort_by_category.values().sum()
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let run = self
            .run_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut lines = vec![
            format!("Run {}", run),
            "======================".to_string(),
            format!(
                "Status: {}",
                if self.complete { "complete" } else { "partial" }
            ),
            format!(
                "Fetch: {} queries ({} failed), {} items, {} unique",
                self.queries, self.failed_queries, self.fetched, self.unique_items
            ),
            format!(
                "Filter: {} containers, {} removed",
                self.containers, self.removed
            ),
            format!(
                "Classify: {} submitted, {} calls, {} splits, {} salvaged, {} lost",
                self.submitted, self.calls, self.splits, self.salvaged, self.lost_items
            ),
            format!(
                "Results: {} classified, {} dropped",
                self.classified, self.dropped_results
            ),
            format!("Elapsed: {}ms", self.elapsed_ms),
        ];

        if !self.effort_by_category.is_empty() {
            lines.push(String::new());
            lines.push("Effort by category:".to_string());
            for (category, minutes) in &self.effort_by_category {
                lines.push(format!("  {}: {:.0} min", category, minutes));
            }
            lines.push(format!("  Total: {:.0} min", self.total_effort()));
        }

        if !self.effort_by_owner.is_empty() {
            lines.push(String::new());
            lines.push("Effort by owner:".to_string());
            for (owner, minutes) in &self.effort_by_owner {
                lines.push(format!("  {}: {:.0} min", owner, minutes));
            }
        }

        if !self.workload.is_empty() {
            lines.push(String::new());
            lines.push("Workload (highest deficit first):".to_string());
            for (rank, load) in self.workload.iter().enumerate() {
                lines.push(format!(
                    "  {}. {}: {:.0}/{:.0} min, load {:.2}, deficit {:+.0} min, {}",
                    rank + 1,
                    load.owner,
                    load.total_minutes,
                    load.capacity_minutes,
                    load.load_ratio,
                    load.deficit_minutes,
                    load.status
                ));
            }
        }

        lines.join("\n")
    }
}
