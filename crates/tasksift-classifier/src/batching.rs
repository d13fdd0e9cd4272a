//! Batch partitioning and bisection

use std::ops::Range;

/// Contiguous ranges of at most `batch_size` covering `0..len`, in order
pub fn partition(len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(len))
        .collect()
}

/// Split a failed batch at `floor(len / 2)`.
///
/// Returns `None` at the floor: when the batch is no larger than `min_batch`
/// or has a single item.
pub fn bisect(range: &Range<usize>, min_batch: usize) -> Option<(Range<usize>, Range<usize>)> {
    let len = range.len();
    if len <= min_batch.max(1) {
        return None;
    }
    let mid = range.start + len / 2;
    Some((range.start..mid, mid..range.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_partition() {
        assert_eq!(partition(10, 4), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition(8, 4), vec![0..4, 4..8]);
        assert!(partition(0, 4).is_empty());
        assert_eq!(partition(3, 70), vec![0..3]);
    }

    #[test]
    fn test_bisect_floor_midpoint() {
        assert_eq!(bisect(&(0..10), 2), Some((0..5, 5..10)));
        assert_eq!(bisect(&(5..10), 2), Some((5..7, 7..10)));
        assert_eq!(bisect(&(0..3), 1), Some((0..1, 1..3)));
    }

    #[test]
    fn test_bisect_stops_at_floor() {
        // Exactly min_batch goes straight to salvage
        assert_eq!(bisect(&(0..5), 5), None);
        assert_eq!(bisect(&(0..4), 5), None);
        // A single item never splits
        assert_eq!(bisect(&(3..4), 1), None);
    }

    proptest! {
        #[test]
        fn prop_partition_covers_input_in_order(len in 0usize..500, size in 1usize..100) {
            let ranges = partition(len, size);
            let mut next = 0;
            for range in &ranges {
                prop_assert_eq!(range.start, next);
                prop_assert!(!range.is_empty() && range.len() <= size);
                next = range.end;
            }
            prop_assert_eq!(next, len);
        }

        #[test]
        fn prop_bisect_halves_are_contiguous(start in 0usize..100, len in 2usize..200, min in 1usize..10) {
            let range = start..start + len;
            match bisect(&range, min) {
                Some((left, right)) => {
                    prop_assert!(len > min);
                    prop_assert_eq!(left.start, range.start);
                    prop_assert_eq!(left.end, right.start);
                    prop_assert_eq!(right.end, range.end);
                    prop_assert_eq!(left.len(), len / 2);
                }
                None => prop_assert!(len <= min),
            }
        }
    }
}
