//! Partitioning of embedding items into size-bounded batch groups.

use std::collections::HashSet;

use crate::domain::errors::{BatchError, BatchResult};
use crate::domain::models::{BatchGroup, BatchRequest, EmbeddingItem};

/// Provider cap on requests per batch job.
pub const MAX_REQUESTS_PER_JOB: usize = 50_000;

/// Reject inputs that reuse an item id; ids are the join key for results.
pub fn ensure_unique_ids(items: &[EmbeddingItem]) -> BatchResult<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            return Err(BatchError::DuplicateItemId(item.id.clone()));
        }
    }
    Ok(())
}

/// Build one request line per item, preserving input order.
pub fn build_requests(items: &[EmbeddingItem], model: &str, endpoint: &str) -> Vec<BatchRequest> {
    items
        .iter()
        .map(|item| BatchRequest::for_item(item, model, endpoint))
        .collect()
}

/// Split requests into `ceil(n / max)` groups of at most `max` requests each.
///
/// Order is preserved and every request lands in exactly one group. An empty
/// input yields no groups. A cap of zero is treated as one.
pub fn split_requests(requests: Vec<BatchRequest>, max_per_group: usize) -> Vec<BatchGroup> {
    let max = max_per_group.max(1);
    let mut groups = Vec::with_capacity(requests.len().div_ceil(max));
    let mut remaining = requests.into_iter().peekable();

    while remaining.peek().is_some() {
        let chunk: Vec<BatchRequest> = remaining.by_ref().take(max).collect();
        groups.push(BatchGroup {
            index: groups.len(),
            requests: chunk,
        });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::EMBEDDINGS_ENDPOINT;
    use proptest::prelude::*;

    fn items(n: usize) -> Vec<EmbeddingItem> {
        (0..n)
            .map(|i| EmbeddingItem::new(format!("item-{i}"), format!("text {i}")))
            .collect()
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        let groups = split_requests(Vec::new(), 10);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_small_input_is_single_group() {
        let requests = build_requests(&items(3), "m", EMBEDDINGS_ENDPOINT);
        let groups = split_requests(requests, 50);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0].index, 0);
    }

    #[test]
    fn test_zero_cap_is_clamped() {
        let requests = build_requests(&items(3), "m", EMBEDDINGS_ENDPOINT);
        let groups = split_requests(requests, 0);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut input = items(3);
        input.push(EmbeddingItem::new("item-1", "again"));

        let err = ensure_unique_ids(&input).unwrap_err();
        assert!(matches!(err, BatchError::DuplicateItemId(ref id) if id == "item-1"));
        assert!(ensure_unique_ids(&items(3)).is_ok());
    }

    proptest! {
        /// Property: groups cover the input exactly once, in order, within the cap
        #[test]
        fn proptest_split_preserves_items(n in 0usize..300, cap in 1usize..64) {
            let input = items(n);
            let requests = build_requests(&input, "m", EMBEDDINGS_ENDPOINT);
            let groups = split_requests(requests, cap);

            prop_assert_eq!(groups.len(), n.div_ceil(cap));
            for (index, group) in groups.iter().enumerate() {
                prop_assert_eq!(group.index, index);
                prop_assert!(!group.is_empty());
                prop_assert!(group.len() <= cap);
            }

            let flattened: Vec<&str> = groups.iter().flat_map(BatchGroup::custom_ids).collect();
            let expected: Vec<&str> = input.iter().map(|i| i.id.as_str()).collect();
            prop_assert_eq!(flattened, expected);
        }
    }
}
