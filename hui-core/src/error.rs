use std::fmt;

/// Errors rejected at `Itemset` construction or mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemsetError {
    NegativeUtility(i64),
    DuplicateItem(ItemName),
}

use crate::ItemName;

impl fmt::Display for ItemsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeUtility(u) => write!(f, "itemset utility must be non-negative, got {u}"),
            Self::DuplicateItem(name) => write!(f, "item {name} already present in itemset"),
        }
    }
}

impl std::error::Error for ItemsetError {}

/// Non-fatal errors produced while reading a `TransactionSource`.
/// Per the error handling design, these are always skipped, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    MalformedLine { line_no: usize, reason: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine { line_no, reason } => {
                write!(f, "malformed transaction at line {line_no}: {reason}")
            }
        }
    }
}

impl std::error::Error for SourceError {}
