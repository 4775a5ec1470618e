use crate::record::HuiRecord;
use hui_core::ItemName;
use std::collections::HashMap;

/// How per-client utilities for the same item-sequence are combined
/// (§4.H). Sum is the default; mean is the documented alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    Sum,
    Mean,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::Sum
    }
}

/// One client's contribution to a round: its surviving HUIs plus the
/// `min_utility` it mined with, which overrides the server default for
/// this client's records (§4.I).
pub struct ClientContribution {
    pub client_id: String,
    pub huis: Vec<HuiRecord>,
    pub min_utility: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationReport {
    pub merged: Vec<HuiRecord>,
    pub communication_cost_bytes: u64,
    pub cumulative_communication_cost_bytes: u64,
    pub contributing_clients: Vec<String>,
    pub client_round_counts: HashMap<String, u64>,
    pub data_heterogeneity: f64,
}

/// Merges per-client HUI sets into one global set (§4.H). `running_totals`
/// carries forward each client's cumulative round count and the running
/// communication-cost total so the caller doesn't have to.
pub fn aggregate(
    contributions: &[ClientContribution],
    policy: MergePolicy,
    min_utility: u64,
    prior_cumulative_bytes: u64,
    client_round_counts: &mut HashMap<String, u64>,
    client_data_sizes: &[u64],
) -> AggregationReport {
    let mut sums: HashMap<Vec<ItemName>, (u64, u64)> = HashMap::new(); // (total_utility, contributor_count)

    for contribution in contributions {
        for record in &contribution.huis {
            if record.utility < contribution.min_utility {
                continue;
            }
            let entry = sums.entry(record.items.clone()).or_insert((0, 0));
            entry.0 += record.utility;
            entry.1 += 1;
        }
        *client_round_counts.entry(contribution.client_id.clone()).or_insert(0) += 1;
    }

    let mut merged: Vec<HuiRecord> = sums
        .into_iter()
        .map(|(items, (total, count))| {
            let utility = match policy {
                MergePolicy::Sum => total,
                MergePolicy::Mean => total / count.max(1),
            };
            HuiRecord { items, utility }
        })
        .filter(|record| record.utility >= min_utility)
        .collect();

    merged.sort_by(|a, b| b.utility.cmp(&a.utility).then_with(|| a.items.cmp(&b.items)));

    let communication_cost_bytes: u64 = merged.iter().map(|r| r.communication_cost()).sum();
    let cumulative_communication_cost_bytes = prior_cumulative_bytes + communication_cost_bytes;

    AggregationReport {
        merged,
        communication_cost_bytes,
        cumulative_communication_cost_bytes,
        contributing_clients: contributions.iter().map(|c| c.client_id.clone()).collect(),
        client_round_counts: client_round_counts.clone(),
        data_heterogeneity: data_heterogeneity(client_data_sizes),
    }
}

/// Coefficient of variation (`std / mean`) of client data sizes, a
/// diagnostic for how unevenly data is distributed across participants.
fn data_heterogeneity(sizes: &[u64]) -> f64 {
    if sizes.is_empty() {
        return 0.0;
    }
    let mean = sizes.iter().sum::<u64>() as f64 / sizes.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = sizes.iter().map(|&s| (s as f64 - mean).powi(2)).sum::<f64>() / sizes.len() as f64;
    variance.sqrt() / mean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(items: &[i64], utility: u64) -> HuiRecord {
        HuiRecord {
            items: items.iter().map(|&n| ItemName::Int(n)).collect(),
            utility,
        }
    }

    #[test]
    fn single_client_sum_equals_taking_it_directly() {
        let contributions = vec![ClientContribution {
            client_id: "a".to_string(),
            huis: vec![record(&[1], 10)],
            min_utility: 0,
        }];
        let mut counts = HashMap::new();
        let report = aggregate(&contributions, MergePolicy::Sum, 0, 0, &mut counts, &[5]);
        assert_eq!(report.merged, vec![record(&[1], 10)]);
    }

    #[test]
    fn sum_policy_combines_matching_itemsets() {
        let contributions = vec![
            ClientContribution {
                client_id: "a".to_string(),
                huis: vec![record(&[1, 2], 10)],
                min_utility: 0,
            },
            ClientContribution {
                client_id: "b".to_string(),
                huis: vec![record(&[1, 2], 6)],
                min_utility: 0,
            },
        ];
        let mut counts = HashMap::new();
        let report = aggregate(&contributions, MergePolicy::Sum, 0, 0, &mut counts, &[5, 5]);
        assert_eq!(report.merged[0].utility, 16);
    }

    #[test]
    fn drops_records_below_min_utility() {
        let contributions = vec![ClientContribution {
            client_id: "a".to_string(),
            huis: vec![record(&[1], 2)],
            min_utility: 0,
        }];
        let mut counts = HashMap::new();
        let report = aggregate(&contributions, MergePolicy::Sum, 10, 0, &mut counts, &[1]);
        assert!(report.merged.is_empty());
    }

    #[test]
    fn communication_cost_accumulates_across_rounds() {
        let contributions = vec![ClientContribution {
            client_id: "a".to_string(),
            huis: vec![record(&[1, 2], 10)],
            min_utility: 0,
        }];
        let mut counts = HashMap::new();
        let round1 = aggregate(&contributions, MergePolicy::Sum, 0, 0, &mut counts, &[5]);
        let round2 = aggregate(
            &contributions,
            MergePolicy::Sum,
            0,
            round1.cumulative_communication_cost_bytes,
            &mut counts,
            &[5],
        );
        assert_eq!(round2.cumulative_communication_cost_bytes, round1.communication_cost_bytes * 2);
        assert_eq!(*counts.get("a").unwrap(), 2);
    }

    #[test]
    fn heterogeneity_is_zero_for_identical_client_sizes() {
        assert_eq!(data_heterogeneity(&[10, 10, 10]), 0.0);
    }
}
