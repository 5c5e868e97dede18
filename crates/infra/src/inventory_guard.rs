//! Stock sufficiency check for ingredient deductions.

use tracing::warn;

use elast_core::{DomainError, DomainResult, IngredientId, Quantity, StockRef};
use elast_events::{EventBus, EventEnvelope};
use elast_ledger::{LedgerEntry, LedgerEvent, LedgerTail, Movement, Posting};

use crate::ledger_store::{LedgerStorage, LedgerStore};

/// `InsufficientStock` unless `available` covers `requested`.
pub fn ensure_available(available: Quantity, requested: Quantity) -> DomainResult<()> {
    requested.ensure_non_negative("requested amount")?;
    if requested > available {
        return Err(DomainError::insufficient_stock(available, requested));
    }
    Ok(())
}

/// Guards ingredient ledgers against going negative.
///
/// Available stock is the tail balance of the ingredient's ledger (the cached
/// on-hand quantity is kept equal to it by the storage).
#[derive(Debug)]
pub struct InventoryGuard<'a, S, B> {
    store: &'a LedgerStore<S, B>,
}

impl<'a, S, B> InventoryGuard<'a, S, B>
where
    S: LedgerStorage,
    B: EventBus<EventEnvelope<LedgerEvent>>,
{
    pub fn new(store: &'a LedgerStore<S, B>) -> Self {
        Self { store }
    }

    /// Check and deduct as one unit for this ingredient.
    ///
    /// The sufficiency check runs against the exact tail the deduction is
    /// appended to; a concurrent deduction in between forces a re-check, so
    /// two deductions can never both pass against the same stale balance.
    pub fn check_and_reserve(
        &self,
        ingredient: IngredientId,
        requested: Quantity,
        particulars: &str,
        remarks: Option<String>,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> DomainResult<LedgerEntry> {
        let stock = StockRef::ingredient(ingredient);
        let posting = Posting::new(Movement::outward(requested), particulars, occurred_at).with_remarks(remarks);

        self.store
            .append_guarded(stock, &posting, |tail: &LedgerTail| ensure_available(tail.balance, requested))
            .inspect_err(|err| {
                if let DomainError::InsufficientStock { available, requested } = err {
                    warn!(ingredient = %ingredient, %available, %requested, "insufficient stock for deduction");
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger_store::InMemoryLedgerStorage;
    use chrono::Utc;

    fn stocked(units: i64) -> (LedgerStore<InMemoryLedgerStorage>, IngredientId) {
        let store = LedgerStore::new(InMemoryLedgerStorage::new());
        let ingredient = IngredientId::new();
        store
            .append(
                StockRef::ingredient(ingredient),
                &Posting::new(Movement::inward(Quantity::from_units(units)), "opening stock", Utc::now()),
            )
            .unwrap();
        (store, ingredient)
    }

    #[test]
    fn exact_balance_can_be_consumed() {
        let (store, ingredient) = stocked(20);
        let guard = InventoryGuard::new(&store);
        let entry = guard
            .check_and_reserve(ingredient, Quantity::from_units(20), "Order 1", None, Utc::now())
            .unwrap();
        assert_eq!(entry.balance(), Quantity::ZERO);
    }

    #[test]
    fn over_deduction_is_rejected_without_mutation() {
        let (store, ingredient) = stocked(20);
        let guard = InventoryGuard::new(&store);

        let err = guard
            .check_and_reserve(ingredient, Quantity::from_units(30), "Order 1", None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::insufficient_stock(Quantity::from_units(20), Quantity::from_units(30))
        );
        assert_eq!(store.ledger(StockRef::ingredient(ingredient)).unwrap().len(), 1);
        assert_eq!(
            store.storage().current_quantity(ingredient).unwrap(),
            Quantity::from_units(20)
        );
    }

    #[test]
    fn unstocked_ingredient_has_nothing_available() {
        let store = LedgerStore::new(InMemoryLedgerStorage::new());
        let guard = InventoryGuard::new(&store);
        let ingredient = IngredientId::new();

        let err = guard
            .check_and_reserve(ingredient, Quantity::from_milli(1), "Order 1", None, Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(Quantity::ZERO, Quantity::from_milli(1)));
        assert!(store.ledger(StockRef::ingredient(ingredient)).unwrap().is_empty());
    }

    #[test]
    fn negative_request_is_invalid() {
        assert!(matches!(
            ensure_available(Quantity::from_units(5), Quantity::from_units(-1)),
            Err(DomainError::InvalidQuantity(_))
        ));
    }
}
