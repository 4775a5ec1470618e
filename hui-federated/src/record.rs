use hui_core::{Itemset, ItemName};
use serde::{Deserialize, Serialize};

/// The canonical shape that crosses process boundaries: a sorted item
/// sequence and an aggregate utility. This is the only itemset
/// representation the wire protocol knows about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuiRecord {
    pub items: Vec<ItemName>,
    pub utility: u64,
}

impl From<&Itemset> for HuiRecord {
    fn from(itemset: &Itemset) -> Self {
        Self {
            items: itemset.items().to_vec(),
            utility: itemset.utility(),
        }
    }
}

impl From<Itemset> for HuiRecord {
    fn from(itemset: Itemset) -> Self {
        Self::from(&itemset)
    }
}

impl HuiRecord {
    /// `8 * |items| + 8` bytes, the per-record communication-cost formula
    /// from §4.H: one 8-byte slot per item plus an 8-byte utility slot.
    pub fn communication_cost(&self) -> u64 {
        8 * self.items.len() as u64 + 8
    }
}
