//! The UP-Tree: a prefix tree keyed by transaction-weighted utility (TWU)
//! that the mining engine builds once per dataset and then reads without
//! mutation.

use hui_core::ItemName;
use petgraph::graph::DiGraph;
use petgraph::Direction;
use std::collections::HashMap;

pub use petgraph::graph::NodeIndex;

/// A node in the prefix tree. The root is the only node with `item_name =
/// None`; every other node represents one item along some transaction's
/// filtered, TWU-sorted prefix.
#[derive(Debug, Clone)]
pub struct UpNode {
    item_name: Option<ItemName>,
    count: u64,
    node_utility: u64,
}

impl UpNode {
    fn root() -> Self {
        Self {
            item_name: None,
            count: 0,
            node_utility: 0,
        }
    }

    pub fn item_name(&self) -> Option<&ItemName> {
        self.item_name.as_ref()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn node_utility(&self) -> u64 {
        self.node_utility
    }
}

/// Owns the tree's nodes and the header table that threads same-item nodes
/// together (§4.B). Parent/child edges live in the graph; node-link chains
/// live in `header_table`. Populated by the builder, read-only during
/// mining, reset by [`UpTree::clear`].
pub struct UpTree {
    graph: DiGraph<UpNode, ()>,
    root: NodeIndex,
    header_table: HashMap<ItemName, Vec<NodeIndex>>,
    item_to_twu: HashMap<ItemName, u64>,
    min_utility: u64,
    generation: u64,
}

impl UpTree {
    pub fn new(min_utility: u64) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(UpNode::root());
        Self {
            graph,
            root,
            header_table: HashMap::new(),
            item_to_twu: HashMap::new(),
            min_utility,
            generation: 0,
        }
    }

    /// Identifies this tree instance for cache-keying purposes. Stable for
    /// the tree's lifetime; combined with `generation()` it tells a cache
    /// whether a previously stored `NodeIndex` is still meaningful.
    pub fn identity(&self) -> usize {
        self as *const UpTree as usize
    }

    /// Increments every time `clear()` drops the underlying graph.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn min_utility(&self) -> u64 {
        self.min_utility
    }

    pub fn set_item_twu(&mut self, name: ItemName, twu: u64) {
        self.item_to_twu.insert(name, twu);
    }

    pub fn get_item_twu(&self, name: &ItemName) -> Option<u64> {
        self.item_to_twu.get(name).copied()
    }

    /// Items whose TWU clears `min_utility`, sorted descending by TWU with
    /// ties broken by name ascending (same order as
    /// [`UpTree::get_items_by_twu`], just pre-filtered).
    pub fn get_promising_items(&self) -> Vec<ItemName> {
        self.get_items_by_twu()
            .into_iter()
            .filter(|name| self.item_to_twu.get(name).copied().unwrap_or(0) >= self.min_utility)
            .collect()
    }

    /// All known items, sorted descending by TWU, ties broken by name
    /// ascending (Invariant 2).
    pub fn get_items_by_twu(&self) -> Vec<ItemName> {
        let mut items: Vec<&ItemName> = self.item_to_twu.keys().collect();
        items.sort_by(|a, b| {
            let twu_a = self.item_to_twu[*a];
            let twu_b = self.item_to_twu[*b];
            twu_b.cmp(&twu_a).then_with(|| a.cmp(b))
        });
        items.into_iter().cloned().collect()
    }

    fn find_child(&self, parent: NodeIndex, name: &ItemName) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(parent, Direction::Outgoing)
            .find(|&child| self.graph[child].item_name.as_ref() == Some(name))
    }

    /// Inserts one transaction. `items` pairs each item with its
    /// per-transaction utility; `transaction_utility` is unused by the
    /// insertion algorithm itself (TWU is a property of item statistics,
    /// computed upstream) but is accepted to match the documented contract.
    pub fn add_transaction(&mut self, items: &[(ItemName, u64)], _transaction_utility: u64) {
        let mut sorted: Vec<&(ItemName, u64)> = items
            .iter()
            .filter(|(name, _)| self.item_to_twu.get(name).copied().unwrap_or(0) >= self.min_utility)
            .collect();
        sorted.sort_by(|a, b| {
            let twu_a = self.item_to_twu.get(&a.0).copied().unwrap_or(0);
            let twu_b = self.item_to_twu.get(&b.0).copied().unwrap_or(0);
            twu_b.cmp(&twu_a).then_with(|| a.0.cmp(&b.0))
        });

        let mut cursor = self.root;
        for (name, utility) in sorted {
            cursor = match self.find_child(cursor, name) {
                Some(existing) => {
                    let node = &mut self.graph[existing];
                    node.count += 1;
                    node.node_utility += utility;
                    existing
                }
                None => {
                    let child = self.graph.add_node(UpNode {
                        item_name: Some(name.clone()),
                        count: 1,
                        node_utility: *utility,
                    });
                    self.graph.add_edge(cursor, child, ());
                    self.header_table.entry(name.clone()).or_default().push(child);
                    child
                }
            };
        }
    }

    pub fn get_header_nodes(&self, name: &ItemName) -> &[NodeIndex] {
        self.header_table.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn node(&self, idx: NodeIndex) -> &UpNode {
        &self.graph[idx]
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    pub fn is_root(&self, idx: NodeIndex) -> bool {
        idx == self.root
    }

    /// Number of non-root nodes.
    pub fn size(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    /// Longest path from root to a leaf, in edges.
    pub fn depth(&self) -> usize {
        fn walk(tree: &UpTree, node: NodeIndex) -> usize {
            tree.graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|child| 1 + walk(tree, child))
                .max()
                .unwrap_or(0)
        }
        walk(self, self.root)
    }

    /// Resets the tree to an empty root, discarding all inserted
    /// transactions. Item TWU statistics survive so the tree can be rebuilt
    /// without re-running the statistics pass.
    pub fn clear(&mut self) {
        let mut graph = DiGraph::new();
        let root = graph.add_node(UpNode::root());
        self.graph = graph;
        self.root = root;
        self.header_table.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: i64) -> ItemName {
        ItemName::Int(n)
    }

    fn tree_with_twus(min_utility: u64, twus: &[(i64, u64)]) -> UpTree {
        let mut tree = UpTree::new(min_utility);
        for (name, twu) in twus {
            tree.set_item_twu(item(*name), *twu);
        }
        tree
    }

    #[test]
    fn items_by_twu_sorted_descending_name_tiebreak() {
        let tree = tree_with_twus(0, &[(1, 10), (2, 10), (3, 20)]);
        let ordered = tree.get_items_by_twu();
        assert_eq!(ordered, vec![item(3), item(1), item(2)]);
    }

    #[test]
    fn promising_items_filters_by_min_utility() {
        let tree = tree_with_twus(15, &[(1, 10), (2, 20), (3, 30)]);
        assert_eq!(tree.get_promising_items(), vec![item(3), item(2)]);
    }

    #[test]
    fn insertion_merges_shared_prefixes() {
        let mut tree = tree_with_twus(0, &[(1, 30), (2, 20), (3, 10)]);
        tree.add_transaction(&[(item(1), 5), (item(2), 3), (item(3), 2)], 10);
        tree.add_transaction(&[(item(1), 4), (item(2), 6)], 10);

        assert_eq!(tree.size(), 3);
        let item1_nodes = tree.get_header_nodes(&item(1));
        assert_eq!(item1_nodes.len(), 1);
        let node1 = tree.node(item1_nodes[0]);
        assert_eq!(node1.count(), 2);
        assert_eq!(node1.node_utility(), 9);
        assert!(tree.is_root(tree.parent(item1_nodes[0]).unwrap()));
    }

    #[test]
    fn insertion_respects_twu_order_over_arrival_order() {
        let mut tree = tree_with_twus(0, &[(1, 5), (2, 50)]);
        tree.add_transaction(&[(item(1), 1), (item(2), 1)], 2);
        let root_children: Vec<_> = tree
            .graph
            .neighbors_directed(tree.root(), Direction::Outgoing)
            .collect();
        assert_eq!(root_children.len(), 1);
        assert_eq!(tree.node(root_children[0]).item_name(), Some(&item(2)));
    }

    #[test]
    fn filters_items_below_min_utility() {
        let mut tree = tree_with_twus(25, &[(1, 10), (2, 30)]);
        tree.add_transaction(&[(item(1), 1), (item(2), 1)], 2);
        assert_eq!(tree.size(), 1);
        assert!(tree.get_header_nodes(&item(1)).is_empty());
    }

    #[test]
    fn clear_resets_tree_but_keeps_twu_stats() {
        let mut tree = tree_with_twus(0, &[(1, 10)]);
        tree.add_transaction(&[(item(1), 1)], 1);
        assert_eq!(tree.size(), 1);
        tree.clear();
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.get_item_twu(&item(1)), Some(10));
    }

    #[test]
    fn depth_tracks_longest_chain() {
        let mut tree = tree_with_twus(0, &[(1, 30), (2, 20), (3, 10)]);
        tree.add_transaction(&[(item(1), 1), (item(2), 1), (item(3), 1)], 3);
        assert_eq!(tree.depth(), 3);
    }
}
