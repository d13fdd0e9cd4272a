//! Container detection

use crate::{FilterConfig, FilterError};
use tasksift_domain::Item;
use tracing::{debug, info};

/// Why an item was or was not judged a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Subunits are never containers
    Subunit,

    /// Untitled items are never containers
    EmptyTitle,

    /// Title contains an action term, which overrides any structure
    Actionable {
        /// The matched term
        term: String,
    },

    /// Segmented title carrying a structural marker
    Container {
        /// The matched marker
        marker: String,
    },

    /// No signal either way
    Plain,
}

impl Verdict {
    /// Whether this verdict marks a container
    pub fn is_container(&self) -> bool {
        matches!(self, Verdict::Container { .. })
    }
}

/// Items partitioned by the filter
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Items passed on to classification
    pub kept: Vec<Item>,
    /// Containers dropped from the working set
    pub removed: Vec<Item>,
    /// Containers detected, whether dropped or kept
    pub containers: usize,
}

/// Classification-free heuristic for grouping items
#[derive(Debug, Clone)]
pub struct ContainerFilter {
    config: FilterConfig,
}

impl ContainerFilter {
    /// Create a filter, validating and normalising the word lists
    pub fn new(config: FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let normalise = |list: &[String]| -> Vec<String> {
            list.iter().map(|w| w.trim().to_lowercase()).collect()
        };
        Ok(Self {
            config: FilterConfig {
                action_terms: normalise(&config.action_terms),
                structural_markers: normalise(&config.structural_markers),
                ..config
            },
        })
    }

    /// Filter with the default word lists, dropping containers
    pub fn default_config() -> Self {
        let config = FilterConfig::default();
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Evaluate one item
    pub fn evaluate(&self, item: &Item) -> Verdict {
        if item.is_subunit {
            return Verdict::Subunit;
        }
        let title = item.title.trim();
        if title.is_empty() {
            return Verdict::EmptyTitle;
        }

        let lower = title.to_lowercase();
        if let Some(term) = self
            .config
            .action_terms
            .iter()
            .find(|t| contains_term(&lower, t))
        {
            return Verdict::Actionable { term: term.clone() };
        }

        let segments = lower
            .split(self.config.delimiter)
            .filter(|s| !s.trim().is_empty())
            .count();
        if segments < self.config.min_segments {
            return Verdict::Plain;
        }

        match self
            .config
            .structural_markers
            .iter()
            .find(|m| contains_term(&lower, m))
        {
            Some(marker) => Verdict::Container {
                marker: marker.clone(),
            },
            None => Verdict::Plain,
        }
    }

    /// Whether `item` is a container
    pub fn is_container(&self, item: &Item) -> bool {
        self.evaluate(item).is_container()
    }

    /// Split items into those kept and those dropped.
    ///
    /// With `include_containers` set nothing is dropped; containers are still
    /// counted. Items are never modified.
    pub fn apply<I>(&self, items: I) -> FilterOutcome
    where
        I: IntoIterator<Item = Item>,
    {
        let mut outcome = FilterOutcome::default();
        for item in items {
            let verdict = self.evaluate(&item);
            if !verdict.is_container() {
                outcome.kept.push(item);
                continue;
            }

            outcome.containers += 1;
            if self.config.include_containers {
                outcome.kept.push(item);
            } else {
                debug!("Dropping container {} ({:?})", item.id, verdict);
                outcome.removed.push(item);
            }
        }

        info!(
            "Container filter: {} kept, {} removed, {} containers detected",
            outcome.kept.len(),
            outcome.removed.len(),
            outcome.containers
        );
        outcome
    }
}

/// Whether `term` occurs in `haystack` on word boundaries.
///
/// Boundaries are only enforced on sides of the term that are alphanumeric,
/// so `"writer:"` matches `"writer: x"` and `"plan"` does not match `"explanation"`.
fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let needs_start = term.chars().next().is_some_and(char::is_alphanumeric);
    let needs_end = term.chars().next_back().is_some_and(char::is_alphanumeric);

    haystack.match_indices(term).any(|(idx, _)| {
        let start_ok = !needs_start
            || haystack[..idx]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_alphanumeric());
        let end_ok = !needs_end
            || haystack[idx + term.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric());
        start_ok && end_ok
    })
}
