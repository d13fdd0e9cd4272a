//! Fetching many dimensions with bounded concurrency

use crate::error::FetchError;
use crate::fetcher::PagedFetcher;
use crate::merge::merge_into;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use tasksift_domain::traits::ItemSource;
use tasksift_domain::{FetchQuery, Item};
use tracing::{info, warn};

/// Attribute carrying the owner label of the query that produced an item
pub const OWNER_LABEL_ATTRIBUTE: &str = "owner_label";

/// Result of fetching a set of dimensions
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Merged items keyed by id
    pub items: BTreeMap<String, Item>,
    /// Dimensions that failed, with their error
    pub failures: Vec<(FetchQuery, FetchError)>,
    /// Dimensions attempted
    pub queries: usize,
    /// Items fetched before merging
    pub fetched: usize,
}

impl FetchOutcome {
    /// Whether every dimension succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetch every query with at most `concurrency` in flight.
///
/// Results are merged in query order (last-write-wins), so a later
/// dimension's view of an item replaces an earlier one regardless of which
/// finished first. A failed dimension is recorded and the rest continue.
pub async fn fetch_dimensions<S: ItemSource>(
    fetcher: &PagedFetcher<S>,
    queries: Vec<FetchQuery>,
    concurrency: usize,
) -> FetchOutcome {
    let mut outcome = FetchOutcome {
        queries: queries.len(),
        ..Default::default()
    };

    let mut results = stream::iter(queries)
        .map(|query| async move {
            let result = fetcher.fetch(&query).await;
            (query, result)
        })
        .buffered(concurrency.max(1));

    while let Some((query, result)) = results.next().await {
        match result {
            Ok(items) => {
                outcome.fetched += items.len();
                let items = items.into_iter().map(|item| annotate(item, &query));
                merge_into(&mut outcome.items, items);
            }
            Err(e) => {
                warn!("Dimension {} failed: {}", query, e);
                outcome.failures.push((query, e));
            }
        }
    }

    info!(
        "Fetched {} dimensions: {} items, {} unique, {} failed",
        outcome.queries,
        outcome.fetched,
        outcome.items.len(),
        outcome.failures.len()
    );
    outcome
}

fn annotate(mut item: Item, query: &FetchQuery) -> Item {
    if let Some(label) = &query.owner_label {
        item.attributes
            .insert(OWNER_LABEL_ATTRIBUTE.to_string(), Value::String(label.clone()));
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::mock::MockSource;
    use crate::plan::{FetchPlan, Owner};
    use chrono::NaiveDate;
    use tasksift_domain::SourceResponse;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_dimensions_merges_and_annotates() {
        let source = MockSource::new(vec![
            Item::new("1", "Acme | Digest runs 5/5").with_owner("u1").with_due(day(5)),
            Item::new("2", "Writer: lead").with_owner("u1").with_due(day(5)).as_subunit(),
            Item::new("3", "Draft copy").with_owner("u2").with_due(day(6)),
        ]);
        let fetcher = PagedFetcher::new(source, FetchConfig::default());
        let plan = FetchPlan::new(vec![Owner::new("Una", "u1"), Owner::new("Dos", "u2")]);

        let outcome = fetch_dimensions(&fetcher, plan.queries(day(5), day(6)), 3).await;

        assert!(outcome.is_complete());
        assert_eq!(outcome.queries, 2 * 2 * 2);
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items["2"].attribute_str(OWNER_LABEL_ATTRIBUTE), Some("Una"));
        assert_eq!(outcome.items["3"].attribute_str(OWNER_LABEL_ATTRIBUTE), Some("Dos"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_dimension_does_not_abort_others() {
        let source = MockSource::new(vec![
            Item::new("1", "a").with_due(day(5)),
            Item::new("2", "b").with_due(day(6)),
        ])
        .when(
            |q| q.day == NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
            SourceResponse::Rejected {
                status: 403,
                message: "forbidden".to_string(),
            },
        );
        let fetcher = PagedFetcher::new(source, FetchConfig::default());
        let queries = vec![FetchQuery::for_day(day(5)), FetchQuery::for_day(day(6))];

        let outcome = fetch_dimensions(&fetcher, queries, 2).await;

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0.day, day(5));
        assert_eq!(outcome.items.len(), 1);
        assert!(outcome.items.contains_key("2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_dimension_wins() {
        let parent = Item::new("7", "Editor: proof").with_due(day(5));
        let sub = Item::new("7", "Editor: proof").with_due(day(5)).as_subunit();
        let source = MockSource::new(vec![parent, sub]);
        let fetcher = PagedFetcher::new(source, FetchConfig::default());
        let queries = FetchPlan::default().queries(day(5), day(5));

        let outcome = fetch_dimensions(&fetcher, queries, 2).await;

        assert_eq!(outcome.fetched, 2);
        assert_eq!(outcome.items.len(), 1);
        assert!(outcome.items["7"].is_subunit);
    }
}
