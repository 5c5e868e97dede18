//! Append-only ledger store.
//!
//! [`LedgerStorage`] is the persistence boundary (one ledger per stock entity,
//! entity-scoped atomicity). [`LedgerStore`] sits on top of it and owns the
//! "read tail → compute balance → append" primitive, retrying internally when
//! another writer got to the same ledger first.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStorage;
pub use r#trait::{LedgerStorage, LedgerStorageError};

use tracing::{debug, warn};

use elast_core::{DomainResult, EntryId, ExpectedVersion, Quantity, StockRef};
use elast_events::{DiscardingBus, Event, EventBus, EventEnvelope};
use elast_ledger::{LedgerEntry, LedgerEvent, LedgerTail, Posting};

/// Default number of attempts before a contended append gives up.
pub const DEFAULT_MAX_APPEND_ATTEMPTS: u32 = 8;

/// Ledger writer: the only component that computes and stores balances.
///
/// Every append runs under optimistic concurrency: the tail is read, the new
/// entry is built from it, and the storage commits only if the ledger version
/// is still the one that was read. On conflict the whole read/compute/append
/// is retried, up to `max_attempts` times.
///
/// Committed entries are published to the bus as `LedgerEvent::EntryAppended`
/// envelopes after the append.
#[derive(Debug)]
pub struct LedgerStore<S, B = DiscardingBus> {
    storage: S,
    bus: B,
    max_attempts: u32,
}

impl<S> LedgerStore<S, DiscardingBus> {
    pub fn new(storage: S) -> Self {
        Self::with_bus(storage, DiscardingBus)
    }
}

impl<S, B> LedgerStore<S, B> {
    pub fn with_bus(storage: S, bus: B) -> Self {
        Self {
            storage,
            bus,
            max_attempts: DEFAULT_MAX_APPEND_ATTEMPTS,
        }
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S, B> LedgerStore<S, B>
where
    S: LedgerStorage,
    B: EventBus<EventEnvelope<LedgerEvent>>,
{
    /// Append a movement to `stock`'s ledger and return the committed entry.
    ///
    /// Negative inward/outward is rejected with `InvalidQuantity` before the
    /// storage is touched.
    pub fn append(&self, stock: StockRef, posting: &Posting) -> DomainResult<LedgerEntry> {
        self.append_guarded(stock, posting, |_| Ok(()))
    }

    /// Like [`append`](Self::append), but `guard` is evaluated against the
    /// tail the entry is built from. The entry only commits if the ledger has
    /// not moved since, so the guard's decision and the append are one unit.
    /// A guard error aborts without writing.
    pub fn append_guarded<G>(&self, stock: StockRef, posting: &Posting, guard: G) -> DomainResult<LedgerEntry>
    where
        G: Fn(&LedgerTail) -> DomainResult<()>,
    {
        posting.movement.validate()?;

        let mut attempt = 0;
        loop {
            attempt += 1;

            let tail = self.storage.read_tail(stock)?;
            guard(&tail)?;
            let entry = LedgerEntry::next(stock, &tail, EntryId::new(), posting)?;

            match self.storage.append_entry(entry, ExpectedVersion::Exact(tail.version)) {
                Ok(committed) => {
                    debug!(
                        stock = %stock,
                        sequence = committed.sequence(),
                        inward = %committed.inward(),
                        outward = %committed.outward(),
                        balance = %committed.balance(),
                        "ledger entry appended"
                    );
                    self.publish(&committed);
                    return Ok(committed);
                }
                Err(LedgerStorageError::Concurrency(msg)) if attempt < self.max_attempts => {
                    warn!(stock = %stock, attempt, reason = %msg, "ledger append contended, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn ledger(&self, stock: StockRef) -> DomainResult<Vec<LedgerEntry>> {
        Ok(self.storage.load_ledger(stock)?)
    }

    pub fn tail(&self, stock: StockRef) -> DomainResult<LedgerTail> {
        Ok(self.storage.read_tail(stock)?)
    }

    pub fn balance(&self, stock: StockRef) -> DomainResult<Quantity> {
        Ok(self.tail(stock)?.balance)
    }

    fn publish(&self, committed: &LedgerEntry) {
        let envelope = LedgerEvent::EntryAppended(committed.clone()).into_envelope();
        // The entry is committed regardless; a lost notification must not be
        // reported as a failed append.
        if let Err(err) = self.bus.publish(envelope) {
            warn!(stock = %committed.stock(), sequence = committed.sequence(), error = ?err, "ledger event publication failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;
    use elast_core::{DomainError, FormulaId, IngredientId};
    use elast_events::InMemoryEventBus;
    use elast_ledger::{Movement, verify_ledger};

    fn posting(inward: i64, outward: i64) -> Posting {
        Posting::new(
            Movement::new(Quantity::from_units(inward), Quantity::from_units(outward)),
            "test",
            Utc::now(),
        )
    }

    /// Storage that reports a conflict for the first `failures` appends.
    struct ContendedStorage {
        inner: InMemoryLedgerStorage,
        failures: AtomicU32,
    }

    impl ContendedStorage {
        fn new(failures: u32) -> Self {
            Self {
                inner: InMemoryLedgerStorage::new(),
                failures: AtomicU32::new(failures),
            }
        }
    }

    impl LedgerStorage for ContendedStorage {
        fn append_entry(
            &self,
            entry: LedgerEntry,
            expected: ExpectedVersion,
        ) -> Result<LedgerEntry, LedgerStorageError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(LedgerStorageError::Concurrency("simulated".to_string()));
            }
            self.inner.append_entry(entry, expected)
        }

        fn read_tail(&self, stock: StockRef) -> Result<LedgerTail, LedgerStorageError> {
            self.inner.read_tail(stock)
        }

        fn load_ledger(&self, stock: StockRef) -> Result<Vec<LedgerEntry>, LedgerStorageError> {
            self.inner.load_ledger(stock)
        }

        fn current_quantity(&self, ingredient: IngredientId) -> Result<Quantity, LedgerStorageError> {
            self.inner.current_quantity(ingredient)
        }
    }

    #[test]
    fn balances_are_running_totals() {
        let store = LedgerStore::new(InMemoryLedgerStorage::new());
        let stock = StockRef::formula(FormulaId::new());

        store.append(stock, &posting(10, 0)).unwrap();
        store.append(stock, &posting(0, 3)).unwrap();
        let last = store.append(stock, &posting(2, 4)).unwrap();

        assert_eq!(last.balance(), Quantity::from_units(5));
        assert_eq!(last.sequence(), 3);
        assert!(verify_ledger(&store.ledger(stock).unwrap()).is_ok());
    }

    #[test]
    fn negative_quantities_leave_ledger_untouched() {
        let store = LedgerStore::new(InMemoryLedgerStorage::new());
        let stock = StockRef::formula(FormulaId::new());
        store.append(stock, &posting(10, 0)).unwrap();

        let err = store.append(stock, &posting(-1, 0)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));
        let err = store.append(stock, &posting(0, -1)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(_)));

        assert_eq!(store.ledger(stock).unwrap().len(), 1);
    }

    #[test]
    fn contention_is_retried_within_budget() {
        let store = LedgerStore::new(ContendedStorage::new(3)).with_max_attempts(4);
        let stock = StockRef::formula(FormulaId::new());

        let entry = store.append(stock, &posting(1, 0)).unwrap();
        assert_eq!(entry.sequence(), 1);
    }

    #[test]
    fn exhausted_retries_surface_as_conflict() {
        let store = LedgerStore::new(ContendedStorage::new(5)).with_max_attempts(2);
        let stock = StockRef::formula(FormulaId::new());

        let err = store.append(stock, &posting(1, 0)).unwrap_err();
        assert!(err.is_conflict());
        assert!(store.ledger(stock).unwrap().is_empty());
    }

    #[test]
    fn guard_rejection_writes_nothing() {
        let store = LedgerStore::new(InMemoryLedgerStorage::new());
        let stock = StockRef::formula(FormulaId::new());

        let err = store
            .append_guarded(stock, &posting(1, 0), |_| Err(DomainError::validation("nope")))
            .unwrap_err();
        assert_eq!(err, DomainError::validation("nope"));
        assert_eq!(store.tail(stock).unwrap(), LedgerTail::EMPTY);
    }

    #[test]
    fn committed_entries_are_published_in_order() {
        let bus: Arc<InMemoryEventBus<EventEnvelope<LedgerEvent>>> = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let store = LedgerStore::with_bus(InMemoryLedgerStorage::new(), bus.clone());
        let stock = StockRef::formula(FormulaId::new());

        store.append(stock, &posting(4, 0)).unwrap();
        store.append(stock, &posting(0, 1)).unwrap();

        let seqs: Vec<u64> = sub.drain().iter().map(|env| env.sequence_number()).collect();
        assert_eq!(seqs, vec![1, 2]);
    }
}
