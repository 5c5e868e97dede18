//! Infrastructure layer: ledger storage, stock guard, propagation engine, config.

pub mod config;
pub mod inventory_guard;
pub mod ledger_store;
pub mod propagation;
pub mod references;

pub use config::{ConfigError, EngineConfig};
pub use inventory_guard::InventoryGuard;
pub use ledger_store::{InMemoryLedgerStorage, LedgerStorage, LedgerStorageError, LedgerStore};
pub use propagation::{PropagationEngine, PropagationError};
pub use references::{ReferenceGenerator, SequentialOrderReferences};
