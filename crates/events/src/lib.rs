//! Ledger events and their distribution.
//!
//! Ledger appends are facts; once an entry is committed it can be published to
//! interested consumers (dashboards, audit exports) through an [`EventBus`].

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{DiscardingBus, EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
