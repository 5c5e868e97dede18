//! Stock ledger module (append-only, running balance).
//!
//! Pure domain logic only: no IO, no locking, no persistence concerns. The
//! only function that computes a balance is [`LedgerEntry::next`].

pub mod entry;
pub mod replay;

pub use entry::{LedgerEntry, LedgerEvent, LedgerTail, Movement, Posting};
pub use replay::{LedgerIntegrityError, replay_balances, verify_ledger};
