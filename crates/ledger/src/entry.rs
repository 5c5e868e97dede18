use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use elast_core::{DomainError, DomainResult, EntryId, Quantity, StockRef};
use elast_events::Event;

/// A stock movement: quantity received (`inward`) and issued (`outward`).
///
/// Both sides must be non-negative; the net effect on a balance is
/// `inward - outward`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(default)]
    pub inward: Quantity,
    #[serde(default)]
    pub outward: Quantity,
}

impl Movement {
    pub fn new(inward: Quantity, outward: Quantity) -> Self {
        Self { inward, outward }
    }

    pub fn inward(quantity: Quantity) -> Self {
        Self::new(quantity, Quantity::ZERO)
    }

    pub fn outward(quantity: Quantity) -> Self {
        Self::new(Quantity::ZERO, quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.inward.is_zero() && self.outward.is_zero()
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.inward.ensure_non_negative("inward")?;
        self.outward.ensure_non_negative("outward")?;
        Ok(())
    }

    /// Apply this movement to a balance. `None` on overflow.
    pub fn apply_to(&self, balance: Quantity) -> Option<Quantity> {
        balance.checked_add(self.inward)?.checked_sub(self.outward)
    }
}

/// What a caller asks the ledger to record. The balance is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub movement: Movement,
    pub particulars: String,
    pub remarks: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl Posting {
    pub fn new(movement: Movement, particulars: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            movement,
            particulars: particulars.into(),
            remarks: None,
            occurred_at,
        }
    }

    pub fn with_remarks(mut self, remarks: Option<String>) -> Self {
        self.remarks = remarks;
        self
    }
}

/// Position and balance at the end of a ledger.
///
/// `version` is the number of entries (0 for an empty ledger).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTail {
    pub version: u64,
    pub balance: Quantity,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl LedgerTail {
    pub const EMPTY: LedgerTail = LedgerTail {
        version: 0,
        balance: Quantity::ZERO,
        last_timestamp: None,
    };

    pub fn of(entries: &[LedgerEntry]) -> Self {
        entries.last().map(LedgerEntry::tail).unwrap_or(Self::EMPTY)
    }
}

/// One immutable line of a stock ledger.
///
/// Fields are read-only: entries are built exclusively by [`LedgerEntry::next`],
/// which is the only place a `balance` is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    entry_id: EntryId,
    stock: StockRef,
    sequence: u64,
    timestamp: DateTime<Utc>,
    particulars: String,
    inward: Quantity,
    outward: Quantity,
    balance: Quantity,
    remarks: Option<String>,
}

impl LedgerEntry {
    /// Build the entry that follows `tail` in `stock`'s ledger.
    ///
    /// - rejects negative inward/outward with `InvalidQuantity`
    /// - `balance = tail.balance + inward - outward`
    /// - the timestamp never goes backwards relative to the tail
    pub fn next(stock: StockRef, tail: &LedgerTail, entry_id: EntryId, posting: &Posting) -> DomainResult<Self> {
        posting.movement.validate()?;

        let balance = posting.movement.apply_to(tail.balance).ok_or_else(|| {
            DomainError::invalid_quantity(format!("balance of {stock} would overflow"))
        })?;

        let timestamp = match tail.last_timestamp {
            Some(last) if last > posting.occurred_at => last,
            _ => posting.occurred_at,
        };

        Ok(Self {
            entry_id,
            stock,
            sequence: tail.version + 1,
            timestamp,
            particulars: posting.particulars.clone(),
            inward: posting.movement.inward,
            outward: posting.movement.outward,
            balance,
            remarks: posting.remarks.clone(),
        })
    }

    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    pub fn stock(&self) -> StockRef {
        self.stock
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn particulars(&self) -> &str {
        &self.particulars
    }

    pub fn inward(&self) -> Quantity {
        self.inward
    }

    pub fn outward(&self) -> Quantity {
        self.outward
    }

    pub fn movement(&self) -> Movement {
        Movement::new(self.inward, self.outward)
    }

    pub fn balance(&self) -> Quantity {
        self.balance
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// Tail position if this entry is the last one of its ledger.
    pub fn tail(&self) -> LedgerTail {
        LedgerTail {
            version: self.sequence,
            balance: self.balance,
            last_timestamp: Some(self.timestamp),
        }
    }
}

/// Facts emitted by the ledger store after a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    EntryAppended(LedgerEntry),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::EntryAppended(_) => "ledger.entry.appended",
        }
    }

    fn event_id(&self) -> Uuid {
        match self {
            LedgerEvent::EntryAppended(e) => e.entry_id.into(),
        }
    }

    fn stock(&self) -> StockRef {
        match self {
            LedgerEvent::EntryAppended(e) => e.stock,
        }
    }

    fn sequence_number(&self) -> u64 {
        match self {
            LedgerEvent::EntryAppended(e) => e.sequence,
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::EntryAppended(e) => e.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use elast_core::IngredientId;

    fn stock() -> StockRef {
        StockRef::ingredient(IngredientId::new())
    }

    fn posting(inward: i64, outward: i64) -> Posting {
        Posting::new(
            Movement::new(Quantity::from_units(inward), Quantity::from_units(outward)),
            "test",
            Utc::now(),
        )
    }

    #[test]
    fn first_entry_starts_from_zero() {
        let stock = stock();
        let entry = LedgerEntry::next(stock, &LedgerTail::EMPTY, EntryId::new(), &posting(15, 0)).unwrap();
        assert_eq!(entry.sequence(), 1);
        assert_eq!(entry.balance(), Quantity::from_units(15));
        assert_eq!(entry.stock(), stock);
    }

    #[test]
    fn balance_follows_tail() {
        let stock = stock();
        let first = LedgerEntry::next(stock, &LedgerTail::EMPTY, EntryId::new(), &posting(15, 0)).unwrap();
        let second = LedgerEntry::next(stock, &first.tail(), EntryId::new(), &posting(2, 10)).unwrap();
        assert_eq!(second.sequence(), 2);
        assert_eq!(second.balance(), Quantity::from_units(7));
    }

    #[test]
    fn negative_sides_are_rejected() {
        let bad = Posting::new(Movement::new(Quantity::from_units(-1), Quantity::ZERO), "x", Utc::now());
        let err = LedgerEntry::next(stock(), &LedgerTail::EMPTY, EntryId::new(), &bad).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(msg) if msg.contains("inward")));

        let bad = Posting::new(Movement::new(Quantity::ZERO, Quantity::from_units(-1)), "x", Utc::now());
        let err = LedgerEntry::next(stock(), &LedgerTail::EMPTY, EntryId::new(), &bad).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuantity(msg) if msg.contains("outward")));
    }

    #[test]
    fn overflow_is_invalid_quantity() {
        let tail = LedgerTail {
            version: 1,
            balance: Quantity::from_milli(i64::MAX),
            last_timestamp: None,
        };
        let p = Posting::new(Movement::inward(Quantity::from_milli(1)), "x", Utc::now());
        assert!(matches!(
            LedgerEntry::next(stock(), &tail, EntryId::new(), &p),
            Err(DomainError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn timestamp_is_clamped_to_tail() {
        let stock = stock();
        let now = Utc::now();
        let first = LedgerEntry::next(stock, &LedgerTail::EMPTY, EntryId::new(), &Posting::new(Movement::inward(Quantity::from_units(1)), "a", now)).unwrap();
        let earlier = Posting::new(Movement::inward(Quantity::from_units(1)), "b", now - Duration::seconds(30));
        let second = LedgerEntry::next(stock, &first.tail(), EntryId::new(), &earlier).unwrap();
        assert_eq!(second.timestamp(), now);
    }

    #[test]
    fn envelope_carries_ledger_position() {
        let stock = stock();
        let entry = LedgerEntry::next(stock, &LedgerTail::EMPTY, EntryId::new(), &posting(1, 0)).unwrap();
        let env = LedgerEvent::EntryAppended(entry.clone()).into_envelope();
        assert_eq!(env.stock(), stock);
        assert_eq!(env.sequence_number(), 1);
        assert_eq!(env.event_type(), "ledger.entry.appended");
        assert_eq!(env.event_id(), *entry.entry_id().as_uuid());
    }

    #[test]
    fn entry_serializes_with_snake_case_fields() {
        let entry = LedgerEntry::next(stock(), &LedgerTail::EMPTY, EntryId::new(), &posting(3, 1)).unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["inward"], 3000);
        assert_eq!(json["outward"], 1000);
        assert_eq!(json["balance"], 2000);
        assert_eq!(json["stock"]["kind"], "ingredient");
    }
}
