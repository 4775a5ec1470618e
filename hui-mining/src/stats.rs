use hui_core::{ItemName, TransactionSource};
use std::collections::HashMap;

/// Per-item aggregates from a single pass over a `TransactionSource` (§4.C).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ItemStat {
    twu: u64,
    support: u64,
    total_utility: u64,
}

impl ItemStat {
    pub fn twu(&self) -> u64 {
        self.twu
    }

    pub fn support(&self) -> u64 {
        self.support
    }

    pub fn total_utility(&self) -> u64 {
        self.total_utility
    }
}

/// The full item-statistics table produced by one pass over a source.
#[derive(Debug, Clone, Default)]
pub struct ItemStatistics {
    by_item: HashMap<ItemName, ItemStat>,
}

impl ItemStatistics {
    pub fn compute(source: &dyn TransactionSource) -> Self {
        let mut by_item: HashMap<ItemName, ItemStat> = HashMap::new();
        for tx in source.transactions() {
            let share = per_item_utilities(&tx);
            for (name, utility) in tx.items.iter().zip(share.iter()) {
                let entry = by_item.entry(name.clone()).or_default();
                entry.twu += tx.transaction_utility;
                entry.support += 1;
                entry.total_utility += *utility;
            }
        }
        Self { by_item }
    }

    pub fn get(&self, name: &ItemName) -> Option<&ItemStat> {
        self.by_item.get(name)
    }

    pub fn twu(&self, name: &ItemName) -> u64 {
        self.by_item.get(name).map(|s| s.twu).unwrap_or(0)
    }

    pub fn total_utility(&self, name: &ItemName) -> u64 {
        self.by_item.get(name).map(|s| s.total_utility).unwrap_or(0)
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemName> {
        self.by_item.keys()
    }

    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    /// `min(twu)` across `items`, or 0 if the set is empty or contains an
    /// item this table has never seen (matches `item_stats.get(item, {})`
    /// defaulting to 0 in the reference implementation).
    pub fn min_twu_of(&self, items: &[ItemName]) -> u64 {
        items.iter().map(|name| self.twu(name)).min().unwrap_or(0)
    }

    /// Average `total_utility` across `items`, truncated toward zero.
    pub fn avg_total_utility_of(&self, items: &[ItemName]) -> f64 {
        if items.is_empty() {
            return 0.0;
        }
        let sum: u64 = items.iter().map(|name| self.total_utility(name)).sum();
        sum as f64 / items.len() as f64
    }
}

/// Distributes a transaction's utility across its items: the source's own
/// per-item utilities when it supplies them, otherwise an equal split
/// (§4.C, §4.F edge case).
pub(crate) fn per_item_utilities(tx: &hui_core::Transaction) -> Vec<u64> {
    if let Some(per_item) = &tx.per_item_utilities {
        return per_item.clone();
    }
    if tx.items.is_empty() {
        return Vec::new();
    }
    let share = tx.transaction_utility / tx.items.len() as u64;
    tx.items.iter().map(|_| share).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hui_core::{InMemorySource, Transaction};

    #[test]
    fn aggregates_twu_support_and_utility() {
        let source = InMemorySource::new(vec![
            Transaction::new(vec![ItemName::from(1i64), ItemName::from(2i64)], 10),
            Transaction::new(vec![ItemName::from(1i64)], 4),
        ]);
        let stats = ItemStatistics::compute(&source);
        let s1 = stats.get(&ItemName::from(1i64)).unwrap();
        assert_eq!(s1.twu(), 14);
        assert_eq!(s1.support(), 2);
        let s2 = stats.get(&ItemName::from(2i64)).unwrap();
        assert_eq!(s2.twu(), 10);
        assert_eq!(s2.support(), 1);
    }

    #[test]
    fn equal_split_when_no_per_item_utilities() {
        let source = InMemorySource::new(vec![Transaction::new(
            vec![ItemName::from(1i64), ItemName::from(2i64)],
            10,
        )]);
        let stats = ItemStatistics::compute(&source);
        assert_eq!(stats.total_utility(&ItemName::from(1i64)), 5);
        assert_eq!(stats.total_utility(&ItemName::from(2i64)), 5);
    }

    #[test]
    fn respects_explicit_per_item_utilities() {
        let source = InMemorySource::new(vec![Transaction::new(
            vec![ItemName::from(1i64), ItemName::from(2i64)],
            10,
        )
        .with_per_item_utilities(vec![3, 7])]);
        let stats = ItemStatistics::compute(&source);
        assert_eq!(stats.total_utility(&ItemName::from(1i64)), 3);
        assert_eq!(stats.total_utility(&ItemName::from(2i64)), 7);
    }
}
