use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An opaque item identifier: either the reference format's integer item ids
/// or a string label. Carried through the public API; hot loops in
/// `hui-tree`/`hui-mining` intern this to a compact `u32` via `Catalog`
/// instead (see Design Notes). Serialises as a bare JSON number or string,
/// matching the wire format's `items: [name]` shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemName {
    Int(i64),
    Str(String),
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

impl PartialOrd for ItemName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemName {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            // Ints sort before strings; only matters when a dataset mixes
            // both, which the reference format never does.
            (Self::Int(_), Self::Str(_)) => Ordering::Less,
            (Self::Str(_), Self::Int(_)) => Ordering::Greater,
        }
    }
}

impl From<i64> for ItemName {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for ItemName {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ItemName {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_sort_before_strings() {
        assert_eq!(ItemName::from(1i64).cmp(&ItemName::from("bread")), Ordering::Less);
    }

    #[test]
    fn string_names_roundtrip() {
        let name: ItemName = "bread".into();
        assert_eq!(name, ItemName::Str("bread".to_string()));
        assert_eq!(name.to_string(), "bread");
    }
}
