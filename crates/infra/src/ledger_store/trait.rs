use std::sync::Arc;

use thiserror::Error;

use elast_core::{DomainError, ExpectedVersion, IngredientId, Quantity, StockKind, StockRef};
use elast_ledger::{LedgerEntry, LedgerTail, verify_ledger};

/// Ledger storage operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (quantities, stock sufficiency).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStorageError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("ledger {0} failed consistency check: {1}")]
    Inconsistent(StockRef, String),

    #[error("storage lock poisoned")]
    Poisoned,
}

impl From<LedgerStorageError> for DomainError {
    fn from(value: LedgerStorageError) -> Self {
        match value {
            LedgerStorageError::Concurrency(msg) => DomainError::Conflict(msg),
            LedgerStorageError::InvalidAppend(msg) => DomainError::Validation(msg),
            other => DomainError::Conflict(other.to_string()),
        }
    }
}

/// Append-only, per-entity ledger persistence.
///
/// The store is agnostic to the backend (document DB, SQL table, memory).
/// Implementations must:
/// - serialise appends per `StockRef` (one ledger is one unit of atomicity)
/// - enforce `expected` against the current ledger version
/// - require `entry.sequence() == current_version + 1`
/// - keep the cached ingredient quantity equal to the tail balance, updating
///   both in the same critical section
///
/// Nothing is ever locked across two ledgers.
pub trait LedgerStorage: Send + Sync {
    /// Append one fully computed entry.
    fn append_entry(
        &self,
        entry: LedgerEntry,
        expected: ExpectedVersion,
    ) -> Result<LedgerEntry, LedgerStorageError>;

    /// Version, balance and timestamp of the last entry ([`LedgerTail::EMPTY`] if none).
    fn read_tail(&self, stock: StockRef) -> Result<LedgerTail, LedgerStorageError>;

    /// Full ledger in append order.
    fn load_ledger(&self, stock: StockRef) -> Result<Vec<LedgerEntry>, LedgerStorageError>;

    /// Cached on-hand quantity of an ingredient.
    fn current_quantity(&self, ingredient: IngredientId) -> Result<Quantity, LedgerStorageError>;

    /// Replay a ledger and compare it with what is stored, including the
    /// cached quantity for ingredients. Only meaningful while the ledger is
    /// not being appended to.
    fn verify_consistency(&self, stock: StockRef) -> Result<(), LedgerStorageError> {
        let entries = self.load_ledger(stock)?;
        verify_ledger(&entries).map_err(|e| LedgerStorageError::Inconsistent(stock, e.to_string()))?;

        if stock.kind == StockKind::Ingredient {
            let cached = self.current_quantity(IngredientId::from_uuid(stock.id))?;
            let tail = LedgerTail::of(&entries).balance;
            if cached != tail {
                return Err(LedgerStorageError::Inconsistent(
                    stock,
                    format!("cached quantity {cached} differs from tail balance {tail}"),
                ));
            }
        }
        Ok(())
    }
}

impl<S> LedgerStorage for Arc<S>
where
    S: LedgerStorage + ?Sized,
{
    fn append_entry(
        &self,
        entry: LedgerEntry,
        expected: ExpectedVersion,
    ) -> Result<LedgerEntry, LedgerStorageError> {
        (**self).append_entry(entry, expected)
    }

    fn read_tail(&self, stock: StockRef) -> Result<LedgerTail, LedgerStorageError> {
        (**self).read_tail(stock)
    }

    fn load_ledger(&self, stock: StockRef) -> Result<Vec<LedgerEntry>, LedgerStorageError> {
        (**self).load_ledger(stock)
    }

    fn current_quantity(&self, ingredient: IngredientId) -> Result<Quantity, LedgerStorageError> {
        (**self).current_quantity(ingredient)
    }
}
