use crate::stats::{per_item_utilities, ItemStatistics};
use hui_core::{ItemName, TransactionSource};
use hui_tree::UpTree;

/// Reads a source a second time and builds the UP-Tree from it (§4.D).
/// `max_items_per_transaction`, when set, truncates each transaction to its
/// top-N items by TWU before insertion.
pub fn build_tree(
    source: &dyn TransactionSource,
    stats: &ItemStatistics,
    min_utility: u64,
    max_items_per_transaction: Option<usize>,
) -> UpTree {
    let mut tree = UpTree::new(min_utility);
    for name in stats.items() {
        tree.set_item_twu(name.clone(), stats.twu(name));
    }

    let promising: std::collections::HashSet<ItemName> = tree.get_promising_items().into_iter().collect();

    for tx in source.transactions() {
        let utilities = per_item_utilities(&tx);
        let mut filtered: Vec<(ItemName, u64)> = tx
            .items
            .iter()
            .cloned()
            .zip(utilities)
            .filter(|(name, _)| promising.contains(name))
            .collect();

        if let Some(max_items) = max_items_per_transaction {
            filtered.sort_by(|a, b| stats.twu(&b.0).cmp(&stats.twu(&a.0)));
            filtered.truncate(max_items);
        }

        if filtered.is_empty() {
            continue;
        }
        tree.add_transaction(&filtered, tx.transaction_utility);
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use hui_core::{InMemorySource, Transaction};

    #[test]
    fn drops_items_below_min_utility() {
        let source = InMemorySource::new(vec![
            Transaction::new(vec![ItemName::from(1i64), ItemName::from(2i64)], 10),
            Transaction::new(vec![ItemName::from(1i64)], 1),
        ]);
        let stats = ItemStatistics::compute(&source);
        let tree = build_tree(&source, &stats, 5, None);
        assert!(!tree.get_header_nodes(&ItemName::from(2i64)).is_empty());
        assert!(tree.get_header_nodes(&ItemName::from(1i64)).is_empty());
    }

    #[test]
    fn truncates_to_top_n_items_per_transaction() {
        let source = InMemorySource::new(vec![Transaction::new(
            vec![ItemName::from(1i64), ItemName::from(2i64), ItemName::from(3i64)],
            30,
        )]);
        let stats = ItemStatistics::compute(&source);
        let tree = build_tree(&source, &stats, 0, Some(1));
        assert_eq!(tree.size(), 1);
    }
}
