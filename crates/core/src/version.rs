//! Optimistic concurrency primitive for append-only ledgers.

/// Optimistic concurrency expectation for a ledger append.
///
/// The version of a ledger is the number of entries it holds (the sequence
/// number of its tail, or 0 when empty).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (opening balances, migrations, etc.).
    Any,
    /// Require the ledger to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
