use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use elast_core::{ExpectedVersion, IngredientId, Quantity, StockRef};
use elast_ledger::{LedgerEntry, LedgerTail};

use super::r#trait::{LedgerStorage, LedgerStorageError};

#[derive(Debug, Default)]
struct Stream {
    entries: Vec<LedgerEntry>,
    /// Cached on-hand quantity; written only together with `entries`.
    current_quantity: Quantity,
}

/// In-memory append-only ledger storage.
///
/// Each ledger sits behind its own mutex, so appends to different entities
/// never contend; the outer map lock is only taken for writing the first time
/// a ledger is touched. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStorage {
    streams: RwLock<HashMap<StockRef, Arc<Mutex<Stream>>>>,
}

impl InMemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self, stock: StockRef) -> Result<Arc<Mutex<Stream>>, LedgerStorageError> {
        {
            let streams = self.streams.read().map_err(|_| LedgerStorageError::Poisoned)?;
            if let Some(stream) = streams.get(&stock) {
                return Ok(stream.clone());
            }
        }
        let mut streams = self.streams.write().map_err(|_| LedgerStorageError::Poisoned)?;
        Ok(streams.entry(stock).or_default().clone())
    }

    /// Read-only access without creating the ledger.
    fn existing(&self, stock: StockRef) -> Result<Option<Arc<Mutex<Stream>>>, LedgerStorageError> {
        let streams = self.streams.read().map_err(|_| LedgerStorageError::Poisoned)?;
        Ok(streams.get(&stock).cloned())
    }
}

impl LedgerStorage for InMemoryLedgerStorage {
    fn append_entry(
        &self,
        entry: LedgerEntry,
        expected: ExpectedVersion,
    ) -> Result<LedgerEntry, LedgerStorageError> {
        let stream = self.stream(entry.stock())?;
        let mut stream = stream.lock().map_err(|_| LedgerStorageError::Poisoned)?;

        let current = LedgerTail::of(&stream.entries).version;
        if !expected.matches(current) {
            return Err(LedgerStorageError::Concurrency(format!(
                "{}: expected {expected:?}, found {current}",
                entry.stock()
            )));
        }
        if entry.sequence() != current + 1 {
            return Err(LedgerStorageError::InvalidAppend(format!(
                "{}: entry sequence {} does not follow version {current}",
                entry.stock(),
                entry.sequence()
            )));
        }

        stream.current_quantity = entry.balance();
        stream.entries.push(entry.clone());
        Ok(entry)
    }

    fn read_tail(&self, stock: StockRef) -> Result<LedgerTail, LedgerStorageError> {
        match self.existing(stock)? {
            Some(stream) => {
                let stream = stream.lock().map_err(|_| LedgerStorageError::Poisoned)?;
                Ok(LedgerTail::of(&stream.entries))
            }
            None => Ok(LedgerTail::EMPTY),
        }
    }

    fn load_ledger(&self, stock: StockRef) -> Result<Vec<LedgerEntry>, LedgerStorageError> {
        match self.existing(stock)? {
            Some(stream) => {
                let stream = stream.lock().map_err(|_| LedgerStorageError::Poisoned)?;
                Ok(stream.entries.clone())
            }
            None => Ok(Vec::new()),
        }
    }

    fn current_quantity(&self, ingredient: IngredientId) -> Result<Quantity, LedgerStorageError> {
        match self.existing(StockRef::ingredient(ingredient))? {
            Some(stream) => {
                let stream = stream.lock().map_err(|_| LedgerStorageError::Poisoned)?;
                Ok(stream.current_quantity)
            }
            None => Ok(Quantity::ZERO),
        }
    }
}
