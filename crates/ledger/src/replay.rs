//! Derived views over a stored ledger.
//!
//! Stored balances are the source of truth; these functions recompute them as
//! a pure prefix sum and report any disagreement. Nothing here writes.

use thiserror::Error;

use elast_core::Quantity;

use crate::entry::LedgerEntry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerIntegrityError {
    #[error("entry at index {index} has sequence {found}, expected {expected}")]
    Sequence { index: usize, expected: u64, found: u64 },

    #[error("entry {sequence} stores balance {stored}, replay gives {replayed}")]
    Balance {
        sequence: u64,
        stored: Quantity,
        replayed: Quantity,
    },

    #[error("entry {sequence} is timestamped before its predecessor")]
    Timestamp { sequence: u64 },

    #[error("entry {sequence} belongs to a different ledger")]
    Owner { sequence: u64 },

    #[error("running balance overflows at entry {sequence}")]
    Overflow { sequence: u64 },
}

/// Recompute the running balance after each entry: Σ(inward − outward).
pub fn replay_balances(entries: &[LedgerEntry]) -> Result<Vec<Quantity>, LedgerIntegrityError> {
    let mut running = Quantity::ZERO;
    let mut out = Vec::with_capacity(entries.len());
    for e in entries {
        running = e
            .movement()
            .apply_to(running)
            .ok_or(LedgerIntegrityError::Overflow { sequence: e.sequence() })?;
        out.push(running);
    }
    Ok(out)
}

/// Check a whole ledger: single owner, contiguous sequence from 1,
/// non-decreasing timestamps, and stored balances equal to the replay.
pub fn verify_ledger(entries: &[LedgerEntry]) -> Result<(), LedgerIntegrityError> {
    let replayed = replay_balances(entries)?;
    let owner = entries.first().map(LedgerEntry::stock);

    let mut previous: Option<&LedgerEntry> = None;
    for (index, (entry, balance)) in entries.iter().zip(replayed).enumerate() {
        let expected = index as u64 + 1;
        if entry.sequence() != expected {
            return Err(LedgerIntegrityError::Sequence {
                index,
                expected,
                found: entry.sequence(),
            });
        }
        if Some(entry.stock()) != owner {
            return Err(LedgerIntegrityError::Owner { sequence: expected });
        }
        if let Some(prev) = previous {
            if entry.timestamp() < prev.timestamp() {
                return Err(LedgerIntegrityError::Timestamp { sequence: expected });
            }
        }
        if entry.balance() != balance {
            return Err(LedgerIntegrityError::Balance {
                sequence: expected,
                stored: entry.balance(),
                replayed: balance,
            });
        }
        previous = Some(entry);
    }
    Ok(())
}
