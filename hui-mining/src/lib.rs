//! Item statistics, tree building, recursive mining, and exact-utility
//! verification: the four passes that turn a `TransactionSource` into a set
//! of published high-utility itemsets.

mod builder;
mod engine;
mod stats;
mod verifier;

pub use builder::build_tree;
pub use engine::{mine, MiningEngine, MiningStats, PathProjection};
pub use stats::{ItemStat, ItemStatistics};
pub use verifier::{verify, VerificationMode, VerificationResult};
