//! Core value types, configuration, and transaction sources shared by the
//! high-utility itemset mining engine and the federated learning layer.

mod catalog;
mod config;
mod error;
mod item;
mod itemset;
mod source;

pub use catalog::Catalog;
pub use config::Config;
pub use error::ItemsetError;
pub use error::SourceError;
pub use item::ItemName;
pub use itemset::Itemset;
pub use source::InMemorySource;
pub use source::TextFileSource;
pub use source::Transaction;
pub use source::TransactionSource;

// ============================================================================
// DEFAULT CAPS
// Every cap below MUST default to "unbounded" per the non-goal that the
// reference implementation's hard-coded limits are a performance hack, not
// a contract. Operators opt in explicitly via `Config::with_*`.
// ============================================================================
/// Reference implementation's undocumented transaction processing cap (unused by default).
pub const REFERENCE_MAX_TRANSACTIONS: usize = 10_000;
/// Reference implementation's undocumented per-transaction item cap (unused by default).
pub const REFERENCE_MAX_ITEMS_PER_TRANSACTION: usize = 15;
/// Reference implementation's undocumented recursion depth cap (unused by default).
pub const REFERENCE_MAX_RECURSION_DEPTH: usize = 8;
/// Reference implementation's undocumented exact-verification cap (unused by default).
pub const REFERENCE_MAX_PHUIS_VERIFIED: usize = 500;
