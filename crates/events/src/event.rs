use chrono::{DateTime, Utc};
use uuid::Uuid;

use elast_core::StockRef;

use crate::envelope::EventEnvelope;

/// A fact about one stock ledger, positioned in that ledger.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "ledger.entry.appended").
    fn event_type(&self) -> &'static str;

    /// Unique id; redelivery of the same fact keeps it.
    fn event_id(&self) -> Uuid;

    /// Ledger the fact belongs to.
    fn stock(&self) -> StockRef;

    /// 1-based position within that ledger.
    fn sequence_number(&self) -> u64;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;

    fn into_envelope(self) -> EventEnvelope<Self> {
        EventEnvelope::new(
            self.event_id(),
            self.stock(),
            self.event_type(),
            self.sequence_number(),
            self,
        )
    }
}
