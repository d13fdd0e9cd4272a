//! Merging classification results by item id

use tasksift_domain::traits::ClassifiedMap;
use tasksift_domain::ClassificationResult;
use tracing::warn;

/// Results keyed by item id, with a count of those that could not be keyed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedResults {
    /// Results by id
    pub results: ClassifiedMap,
    /// Results dropped for lacking an id
    pub dropped: usize,
}

impl MergedResults {
    /// Fold more results in, last write winning
    pub fn absorb<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = ClassificationResult>,
    {
        let mut dropped = 0;
        for result in results {
            if !result.is_attributable() {
                dropped += 1;
                continue;
            }
            self.results.insert(result.id.clone(), result);
        }
        if dropped > 0 {
            warn!("Dropped {} results without an id", dropped);
        }
        self.dropped += dropped;
    }

    /// Number of attributable results
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether no result was attributable
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Merge results into a map keyed by id.
///
/// Later results overwrite earlier ones with the same id. Results with a
/// missing or empty id cannot be attributed and are dropped (counted, never
/// an error).
///
/// # Examples
///
/// ```
/// use tasksift_classifier::merge_results;
/// use tasksift_domain::ClassificationResult;
///
/// let merged = merge_results(vec![
///     ClassificationResult::new("1").with_category("Drafting"),
///     ClassificationResult::new("1").with_category("Editing"),
///     ClassificationResult::new(""),
/// ]);
///
/// assert_eq!(merged.results["1"].category.as_deref(), Some("Editing"));
/// assert_eq!(merged.dropped, 1);
/// ```
pub fn merge_results<I>(results: I) -> MergedResults
where
    I: IntoIterator<Item = ClassificationResult>,
{
    let mut merged = MergedResults::default();
    merged.absorb(results);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let a = ClassificationResult::new("A").with_category("Drafting");
        let b = ClassificationResult::new("A").with_category("Publishing");

        let merged = merge_results(vec![a, b]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.results["A"].category.as_deref(), Some("Publishing"));
        assert_eq!(merged.dropped, 0);
    }

    #[test]
    fn test_empty_id_dropped_without_error() {
        let merged = merge_results(vec![
            ClassificationResult::new("   "),
            ClassificationResult::new(""),
            ClassificationResult::new("B"),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged.dropped, 2);
    }

    #[test]
    fn test_absorb_across_passes() {
        let mut merged = merge_results(vec![ClassificationResult::new("A").with_category("Drafting")]);
        merged.absorb(vec![
            ClassificationResult::new("A").with_category("Editing"),
            ClassificationResult::new("C"),
            ClassificationResult::new(""),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.results["A"].category.as_deref(), Some("Editing"));
        assert_eq!(merged.dropped, 1);
    }

    #[test]
    fn test_merge_nothing() {
        assert!(merge_results(Vec::new()).is_empty());
    }
}
