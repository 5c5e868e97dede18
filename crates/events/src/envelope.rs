use serde::{Deserialize, Serialize};
use uuid::Uuid;

use elast_core::StockRef;

/// Envelope for an event, carrying the owning ledger and its position.
///
/// - `stock` identifies the ledger the event was appended to.
/// - `sequence_number` is the 1-based position of the entry in that ledger,
///   so consumers can detect gaps and drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    stock: StockRef,
    event_type: String,
    sequence_number: u64,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        stock: StockRef,
        event_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stock,
            event_type: event_type.into(),
            sequence_number,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stock(&self) -> StockRef {
        self.stock
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}
