use crate::error::SourceError;
use crate::item::ItemName;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One transaction: the items it contains, its total utility, and,
/// optionally, the utility contributed by each individual item (when the
/// source can supply it; the equal-split policy in §4.F covers sources that
/// cannot).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub items: Vec<ItemName>,
    pub transaction_utility: u64,
    pub per_item_utilities: Option<Vec<u64>>,
}

impl Transaction {
    pub fn new(items: Vec<ItemName>, transaction_utility: u64) -> Self {
        Self {
            items,
            transaction_utility,
            per_item_utilities: None,
        }
    }

    pub fn with_per_item_utilities(mut self, utilities: Vec<u64>) -> Self {
        self.per_item_utilities = Some(utilities);
        self
    }
}

/// A re-readable iterable of transactions. The mining engine reads a source
/// twice (item statistics pass, tree-build pass) and the verifier reads it a
/// third time, so implementations must support repeated independent
/// traversal rather than a one-shot iterator.
pub trait TransactionSource {
    fn transactions(&self) -> Box<dyn Iterator<Item = Transaction> + '_>;
}

/// A source backed by an in-memory vector, for tests and embedded callers.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    transactions: Vec<Transaction>,
}

impl InMemorySource {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }
}

impl TransactionSource for InMemorySource {
    fn transactions(&self) -> Box<dyn Iterator<Item = Transaction> + '_> {
        Box::new(self.transactions.iter().cloned())
    }
}

/// A source backed by the reference text format:
/// `a b c … : T` — whitespace-separated item names, a single `:` separator,
/// then the integer transaction utility. Lines beginning `#`, `%`, or `@`
/// are comments. Malformed lines are logged and skipped, never fatal.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse_line(line_no: usize, line: &str) -> Result<Transaction, SourceError> {
        let (items_part, utility_part) = line.split_once(':').ok_or_else(|| SourceError::MalformedLine {
            line_no,
            reason: "missing ':' separator".to_string(),
        })?;

        let items: Vec<ItemName> = items_part
            .split_whitespace()
            .map(|tok| {
                tok.parse::<i64>()
                    .map(ItemName::Int)
                    .unwrap_or_else(|_| ItemName::Str(tok.to_string()))
            })
            .collect();

        if items.is_empty() {
            return Err(SourceError::MalformedLine {
                line_no,
                reason: "no items before ':'".to_string(),
            });
        }

        let utility: i64 = utility_part
            .trim()
            .parse()
            .map_err(|_| SourceError::MalformedLine {
                line_no,
                reason: format!("non-integer transaction utility {:?}", utility_part.trim()),
            })?;

        if utility < 0 {
            return Err(SourceError::MalformedLine {
                line_no,
                reason: format!("negative transaction utility {utility}"),
            });
        }

        Ok(Transaction::new(items, utility as u64))
    }

    fn read_all(&self) -> Vec<Transaction> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("could not open transaction source {:?}: {e}", self.path);
                return Vec::new();
            }
        };
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("i/o error reading line {line_no}: {e}");
                    continue;
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('%') || trimmed.starts_with('@') {
                continue;
            }
            match Self::parse_line(line_no, trimmed) {
                Ok(tx) => out.push(tx),
                Err(e) => log::warn!("{e}"),
            }
        }
        out
    }
}

impl TransactionSource for TextFileSource {
    fn transactions(&self) -> Box<dyn Iterator<Item = Transaction> + '_> {
        Box::new(self.read_all().into_iter())
    }
}
