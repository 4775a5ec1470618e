use crate::stats::per_item_utilities;
use hui_core::{Config, ItemName, Itemset, TransactionSource};
use std::collections::HashMap;

/// Whether the verifier computed exact per-transaction utilities or fell
/// back to the `approximate_when_candidates_exceed` heuristic. Carried in
/// the result header so callers can tell which mode produced a report
/// (§4.F edge case; must never be silently the default).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationMode {
    Exact,
    Approximate,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub huis: Vec<Itemset>,
    pub mode: VerificationMode,
}

/// Second pass over the source (§4.F): assigns each surviving PHUI its real
/// aggregate utility and keeps only those that clear `min_utility`.
pub fn verify(candidates: &[Itemset], source: &dyn TransactionSource, config: &Config) -> VerificationResult {
    let min_utility = config.min_utility();

    if let Some(threshold) = config.approximate_when_candidates_exceed() {
        if candidates.len() > threshold {
            let huis = candidates
                .iter()
                .map(|c| approximate_utility(c))
                .filter(|c| c.utility() >= min_utility)
                .collect();
            return VerificationResult {
                huis,
                mode: VerificationMode::Approximate,
            };
        }
    }

    let mut totals: HashMap<Vec<ItemName>, u64> = candidates.iter().map(|c| (c.items().to_vec(), 0u64)).collect();

    for tx in source.transactions() {
        let utilities = per_item_utilities(&tx);
        let per_item: HashMap<&ItemName, u64> = tx.items.iter().zip(utilities.iter()).map(|(n, u)| (n, *u)).collect();
        let tx_items: std::collections::HashSet<&ItemName> = tx.items.iter().collect();

        for (key, total) in totals.iter_mut() {
            if key.iter().all(|item| tx_items.contains(item)) {
                for item in key {
                    *total += per_item.get(item).copied().unwrap_or(0);
                }
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    let huis = candidates
        .iter()
        .filter(|c| seen.insert(c.items().to_vec()))
        .filter_map(|c| {
            let exact = *totals.get(c.items()).unwrap_or(&0);
            if exact >= min_utility {
                Itemset::new(c.items().to_vec(), exact as i64).ok()
            } else {
                None
            }
        })
        .collect();

    VerificationResult {
        huis,
        mode: VerificationMode::Exact,
    }
}

/// `|itemset| * heuristic`, the non-default fallback from §4.F. The
/// heuristic constant mirrors the reference's per-item utility proxy.
fn approximate_utility(candidate: &Itemset) -> Itemset {
    let heuristic = candidate.utility().max(1);
    let utility = (candidate.size() as u64) * heuristic;
    Itemset::new(candidate.items().to_vec(), utility as i64).unwrap_or_else(|_| candidate.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hui_core::{InMemorySource, Transaction};

    #[test]
    fn assigns_exact_utility_across_containing_transactions() {
        let source = InMemorySource::new(vec![
            Transaction::new(vec![ItemName::from(1i64), ItemName::from(2i64)], 10).with_per_item_utilities(vec![4, 6]),
            Transaction::new(vec![ItemName::from(1i64)], 3).with_per_item_utilities(vec![3]),
        ]);
        let candidate = Itemset::new(vec![ItemName::from(1i64), ItemName::from(2i64)], 0).unwrap();
        let config = Config::new().with_min_utility(0);
        let result = verify(&[candidate], &source, &config);
        assert_eq!(result.mode, VerificationMode::Exact);
        assert_eq!(result.huis.len(), 1);
        assert_eq!(result.huis[0].utility(), 10);
    }

    #[test]
    fn drops_candidates_below_min_utility_after_verification() {
        let source = InMemorySource::new(vec![Transaction::new(vec![ItemName::from(1i64)], 2).with_per_item_utilities(vec![2])]);
        let candidate = Itemset::new(vec![ItemName::from(1i64)], 0).unwrap();
        let config = Config::new().with_min_utility(10);
        let result = verify(&[candidate], &source, &config);
        assert!(result.huis.is_empty());
    }

    #[test]
    fn uses_approximate_mode_past_candidate_threshold() {
        let source = InMemorySource::new(vec![]);
        let candidates: Vec<Itemset> = (0..5)
            .map(|i| Itemset::new(vec![ItemName::from(i as i64)], 3).unwrap())
            .collect();
        let config = Config::new().with_min_utility(0).with_approximate_when_candidates_exceed(2);
        let result = verify(&candidates, &source, &config);
        assert_eq!(result.mode, VerificationMode::Approximate);
    }
}
