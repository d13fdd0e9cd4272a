//! Merging items from overlapping fetch dimensions

use std::collections::BTreeMap;
use tasksift_domain::Item;
use tracing::debug;

/// Merge several item sequences into one map keyed by `id`.
///
/// Later sequences overwrite earlier ones on collision (last-write-wins).
/// Items without an id cannot be keyed and are skipped.
///
/// # Examples
///
/// ```
/// use tasksift_domain::Item;
/// use tasksift_fetch::merge_items;
///
/// let parents = vec![Item::new("1", "Acme | Digest runs 5/1")];
/// let subunits = vec![Item::new("1", "Acme | Digest runs 5/1").as_subunit()];
///
/// let merged = merge_items([parents, subunits]);
/// assert_eq!(merged.len(), 1);
/// assert!(merged["1"].is_subunit);
/// ```
pub fn merge_items<I, S>(sequences: I) -> BTreeMap<String, Item>
where
    I: IntoIterator<Item = S>,
    S: IntoIterator<Item = Item>,
{
    let mut merged = BTreeMap::new();
    for sequence in sequences {
        merge_into(&mut merged, sequence);
    }
    merged
}

/// Merge one sequence into an existing map, returning how many items were skipped
pub fn merge_into<S>(merged: &mut BTreeMap<String, Item>, sequence: S) -> usize
where
    S: IntoIterator<Item = Item>,
{
    let mut skipped = 0;
    for item in sequence {
        if !item.has_identity() {
            skipped += 1;
            continue;
        }
        merged.insert(item.id.clone(), item);
    }
    if skipped > 0 {
        debug!("Skipped {} items without an id during merge", skipped);
    }
    skipped
}
