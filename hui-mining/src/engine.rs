use crate::stats::ItemStatistics;
use hui_core::{Config, ItemName, Itemset};
use hui_tree::{NodeIndex, UpTree};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Pruning and cache counters accumulated over one `mine` call. Not part of
/// the published result set; surfaced to operators as diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiningStats {
    pub early_termination: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pseudo_projections: u64,
    pub timed_out: bool,
}

/// A set of non-owning node references sharing a conditional prefix, built
/// by walking ancestors of header-table occurrences (§4.E "Path
/// projection"). Usable only while the tree that produced it is alive;
/// `MiningEngine` never holds one across a `clear()`.
#[derive(Debug, Clone, Default)]
pub struct PathProjection {
    nodes: Vec<NodeIndex>,
    utilities: Vec<u64>,
    total_utility: u64,
    support: u64,
}

impl PathProjection {
    pub fn support(&self) -> u64 {
        self.support
    }

    pub fn total_utility(&self) -> u64 {
        self.total_utility
    }
}

/// A bounded insertion-ordered cache. On overflow the oldest half is
/// evicted, matching the resource policy in §5.
struct BoundedCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: Option<usize>,
}

impl<K: std::hash::Hash + Eq + Clone, V> BoundedCache<K, V> {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    fn insert(&mut self, key: K, value: V) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.map.insert(key, value);
        if let Some(cap) = self.capacity {
            if self.map.len() > cap {
                let evict = self.order.len() / 2;
                for _ in 0..evict {
                    if let Some(old_key) = self.order.pop_front() {
                        self.map.remove(&old_key);
                    }
                }
            }
        }
    }
}

/// The recursive high-utility itemset miner (§4.E). Constructed fresh per
/// mining run against one `UpTree`; caches live only for that run's
/// lifetime.
pub struct MiningEngine<'a> {
    tree: &'a UpTree,
    stats: &'a ItemStatistics,
    config: &'a Config,
    ub_cache: BoundedCache<Vec<ItemName>, u64>,
    decision_cache: BoundedCache<Vec<ItemName>, bool>,
    projection_cache: BoundedCache<(usize, u64, ItemName, u64), PathProjection>,
    mining_stats: MiningStats,
    phuis: Vec<Itemset>,
    deadline: Option<Instant>,
}

impl<'a> MiningEngine<'a> {
    pub fn new(tree: &'a UpTree, stats: &'a ItemStatistics, config: &'a Config) -> Self {
        Self {
            tree,
            stats,
            config,
            ub_cache: BoundedCache::new(config.bounds_cache_size()),
            decision_cache: BoundedCache::new(config.bounds_cache_size()),
            projection_cache: BoundedCache::new(config.projection_cache_size()),
            mining_stats: MiningStats::default(),
            phuis: Vec::new(),
            deadline: None,
        }
    }

    /// Mines the whole tree, cancelling cooperatively once `timeout` has
    /// elapsed. A cancelled run returns whatever PHUIs were emitted so far
    /// with `MiningStats::timed_out` set (§7 `TimeoutExceeded`).
    pub fn mine(mut self, timeout: Option<Duration>) -> (Vec<Itemset>, MiningStats) {
        self.deadline = timeout.map(|d| Instant::now() + d);

        let mut items = self.tree.get_promising_items();
        if let Some(cap) = self.config.max_items_per_level() {
            items.truncate(cap);
        }

        for name in items {
            if self.is_expired() {
                self.mining_stats.timed_out = true;
                break;
            }
            if self.phui_cap_reached() {
                break;
            }
            self.process_top_level_item(name);
        }

        (self.phuis, self.mining_stats)
    }

    fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    fn phui_cap_reached(&self) -> bool {
        matches!(self.config.max_phuis_retained(), Some(cap) if self.phuis.len() >= cap)
    }

    fn process_top_level_item(&mut self, name: ItemName) {
        let set = vec![name.clone()];
        if self.should_terminate(&set) {
            self.mining_stats.early_termination += 1;
            return;
        }

        self.emit(Itemset::new(set, self.stats.total_utility(&name) as i64).unwrap_or_else(|_| Itemset::empty()));

        let header_nodes = self.tree.get_header_nodes(&name).to_vec();
        if let Some(projection) = self.build_projection(&name, &header_nodes) {
            if projection.support > 0 {
                self.mine_projection(&projection, &[name]);
            }
        }
    }

    /// §4.E "Projection mining": tally frequency/utility over the
    /// projection's nodes, pick promising extensions, and recurse on each
    /// one's sub-projection.
    fn mine_projection(&mut self, projection: &PathProjection, prefix: &[ItemName]) {
        if self.is_expired() {
            self.mining_stats.timed_out = true;
            return;
        }
        if let Some(cap) = self.config.max_recursion_depth() {
            if prefix.len() >= cap {
                return;
            }
        }

        let mut frequency: HashMap<ItemName, u64> = HashMap::new();
        let mut utility_map: HashMap<ItemName, u64> = HashMap::new();
        for (idx, node) in projection.nodes.iter().enumerate() {
            let name = match self.tree.node(*node).item_name() {
                Some(n) => n.clone(),
                None => continue,
            };
            *frequency.entry(name.clone()).or_insert(0) += 1;
            *utility_map.entry(name).or_insert(0) += projection.utilities[idx];
        }

        let min_util = self.config.min_utility();
        let prefix_set: std::collections::HashSet<&ItemName> = prefix.iter().collect();
        let mut candidates: Vec<(ItemName, u64)> = utility_map
            .into_iter()
            .filter(|(name, utility)| {
                *utility >= min_util && frequency.get(name).copied().unwrap_or(0) >= 1 && !prefix_set.contains(name)
            })
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        if let Some(cap) = self.config.max_items_per_level() {
            candidates.truncate(cap);
        }

        for (name, utility) in candidates {
            if self.is_expired() {
                self.mining_stats.timed_out = true;
                return;
            }
            if self.phui_cap_reached() {
                return;
            }

            let mut extended_set: Vec<ItemName> = prefix.to_vec();
            extended_set.push(name.clone());
            if self.should_terminate(&extended_set) {
                self.mining_stats.early_termination += 1;
                continue;
            }

            self.emit(Itemset::new(extended_set.clone(), utility as i64).unwrap_or_else(|_| Itemset::empty()));

            if let Some(sub) = self.build_sub_projection(projection, &name) {
                if sub.support > 0 {
                    self.mine_projection(&sub, &extended_set);
                }
            }
        }
    }

    /// §4.E "Early termination": cached upper bound check.
    fn should_terminate(&mut self, set: &[ItemName]) -> bool {
        let mut key = set.to_vec();
        key.sort();

        if let Some(&decision) = self.decision_cache.get(&key) {
            self.mining_stats.cache_hits += 1;
            return decision;
        }
        self.mining_stats.cache_misses += 1;

        let ub = match self.ub_cache.get(&key) {
            Some(&cached) => cached,
            None => {
                let computed = self.compute_upper_bound(&key);
                self.ub_cache.insert(key.clone(), computed);
                computed
            }
        };

        let terminate = ub < self.config.min_utility();
        self.decision_cache.insert(key, terminate);
        terminate
    }

    fn compute_upper_bound(&self, set: &[ItemName]) -> u64 {
        if set.is_empty() {
            return 0;
        }
        let min_twu = self.stats.min_twu_of(set);
        let avg_utility = self.stats.avg_total_utility_of(set);
        let relaxed = (avg_utility * set.len() as f64 * self.config.ub_relaxation_factor()).floor();
        min_twu.min(relaxed.max(0.0) as u64)
    }

    fn build_projection(&mut self, item: &ItemName, seed_nodes: &[NodeIndex]) -> Option<PathProjection> {
        let cache_key = (self.tree.identity(), self.tree.generation(), item.clone(), self.config.min_utility());
        if let Some(cached) = self.projection_cache.get(&cache_key) {
            self.mining_stats.cache_hits += 1;
            return Some(cached.clone());
        }
        self.mining_stats.cache_misses += 1;
        self.mining_stats.pseudo_projections += 1;

        let projection = self.build_projection_from_nodes(seed_nodes);
        if let Some(ref p) = projection {
            self.projection_cache.insert(cache_key, p.clone());
        }
        projection
    }

    fn build_sub_projection(&mut self, parent: &PathProjection, item: &ItemName) -> Option<PathProjection> {
        self.mining_stats.pseudo_projections += 1;
        let seeds: Vec<NodeIndex> = parent
            .nodes
            .iter()
            .filter(|&&n| self.tree.node(n).item_name() == Some(item))
            .copied()
            .collect();
        self.build_projection_from_nodes(&seeds)
    }

    fn build_projection_from_nodes(&self, seed_nodes: &[NodeIndex]) -> Option<PathProjection> {
        let min_utility = self.config.min_utility();
        let mut nodes = Vec::new();
        let mut utilities = Vec::new();
        let mut total_utility = 0u64;
        let mut support = 0u64;

        for &seed in seed_nodes {
            let mut path = self.ancestor_path(seed);
            if path.is_empty() {
                continue;
            }
            if let Some(max_len) = self.config.max_path_length() {
                path.truncate(max_len);
            }
            let path_utility: u64 = path.iter().map(|&n| self.tree.node(n).node_utility()).sum();
            if path_utility >= min_utility {
                for &n in &path {
                    nodes.push(n);
                    utilities.push(self.tree.node(n).node_utility());
                }
                total_utility += path_utility;
                support += 1;
            }
        }

        if let Some(cap) = self.config.max_items_per_projection() {
            nodes.truncate(cap);
            utilities.truncate(cap);
        }

        if support == 0 {
            None
        } else {
            Some(PathProjection {
                nodes,
                utilities,
                total_utility,
                support,
            })
        }
    }

    /// Ancestors of `node`'s parent up to (excluding) the root, nearest
    /// first. Both header-table projections and sub-projections use this
    /// same walk (§4.E).
    fn ancestor_path(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path = Vec::new();
        let mut cursor = self.tree.parent(node);
        while let Some(n) = cursor {
            if self.tree.is_root(n) {
                break;
            }
            path.push(n);
            cursor = self.tree.parent(n);
        }
        path
    }

    fn emit(&mut self, itemset: Itemset) {
        if itemset.is_empty() {
            return;
        }
        self.phuis.push(itemset);
    }
}

/// Convenience entry point mirroring the library's layering: statistics,
/// then tree, then mining, kept as three independent calls by callers that
/// want to inspect intermediate state. This wraps the common case.
pub fn mine(tree: &UpTree, stats: &ItemStatistics, config: &Config, timeout: Option<Duration>) -> (Vec<Itemset>, MiningStats) {
    MiningEngine::new(tree, stats, config).mine(timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_tree;
    use hui_core::{InMemorySource, Transaction};

    fn sample_source() -> InMemorySource {
        InMemorySource::new(vec![
            Transaction::new(vec![ItemName::from(1i64), ItemName::from(2i64), ItemName::from(3i64)], 15)
                .with_per_item_utilities(vec![5, 5, 5]),
            Transaction::new(vec![ItemName::from(1i64), ItemName::from(2i64)], 10).with_per_item_utilities(vec![4, 6]),
            Transaction::new(vec![ItemName::from(4i64)], 1).with_per_item_utilities(vec![1]),
            Transaction::new(vec![ItemName::from(5i64)], 1).with_per_item_utilities(vec![1]),
        ])
    }

    #[test]
    fn emits_singleton_huis_for_min_utility_zero() {
        let source = sample_source();
        let stats = ItemStatistics::compute(&source);
        let config = Config::new().with_min_utility(0);
        let tree = build_tree(&source, &stats, 0, None);
        let (huis, _) = mine(&tree, &stats, &config, None);

        let singles: Vec<&Itemset> = huis.iter().filter(|s| s.size() == 1).collect();
        assert_eq!(singles.len(), 5);
    }

    #[test]
    fn min_utility_above_max_yields_empty_set() {
        let source = sample_source();
        let stats = ItemStatistics::compute(&source);
        let config = Config::new().with_min_utility(1_000_000);
        let tree = build_tree(&source, &stats, 1_000_000, None);
        let (huis, _) = mine(&tree, &stats, &config, None);
        assert!(huis.is_empty());
    }

    #[test]
    fn never_emits_an_itemset_with_a_repeated_item() {
        let source = sample_source();
        let stats = ItemStatistics::compute(&source);
        let config = Config::new().with_min_utility(0);
        let tree = build_tree(&source, &stats, 0, None);
        let (huis, _) = mine(&tree, &stats, &config, None);
        for hui in &huis {
            let mut seen = std::collections::HashSet::new();
            for name in hui.items() {
                assert!(seen.insert(name.clone()), "duplicate item in {hui:?}");
            }
        }
    }

    #[test]
    fn tighter_threshold_is_a_subset_of_looser_threshold() {
        let source = sample_source();
        let stats = ItemStatistics::compute(&source);

        let loose_cfg = Config::new().with_min_utility(5);
        let loose_tree = build_tree(&source, &stats, 5, None);
        let (loose, _) = mine(&loose_tree, &stats, &loose_cfg, None);
        let loose_sets: std::collections::HashSet<Vec<ItemName>> =
            loose.iter().map(|s| s.items().to_vec()).collect();

        let tight_cfg = Config::new().with_min_utility(15);
        let tight_tree = build_tree(&source, &stats, 15, None);
        let (tight, _) = mine(&tight_tree, &stats, &tight_cfg, None);

        for hui in &tight {
            assert!(loose_sets.contains(hui.items()));
        }
    }

    #[test]
    fn timeout_halts_without_crashing() {
        let source = sample_source();
        let stats = ItemStatistics::compute(&source);
        let config = Config::new().with_min_utility(0);
        let tree = build_tree(&source, &stats, 0, None);
        let (_huis, mining_stats) = mine(&tree, &stats, &config, Some(Duration::from_nanos(1)));
        assert!(mining_stats.timed_out);
    }
}
