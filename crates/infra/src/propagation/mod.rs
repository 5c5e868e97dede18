//! Propagation engine: cascades a consumption from a product through its
//! formulas down to raw-material ingredients.
//!
//! ```text
//! product ledger   outward = units × unit weight
//!   └─ formula     outward = units × fill weight            (= batches)
//!        └─ ingredient outward = batches × ratio           (guarded)
//! ```
//!
//! Ordering: the product entry is written first, then for each formula its
//! own entry, then that formula's ingredient deductions. No lock spans two
//! ledgers, so the operation as a whole is not atomic: every leg reports its
//! own outcome and committed legs are never rolled back (a correction is a new
//! compensating entry).
//!
//! The engine is not idempotent: repeating a call deducts again.

pub mod report;
pub mod request;

pub use report::{
    FormulaReport, FormulaUsageResult, IngredientReport, OrderFulfillment, Outcome, ProductReport,
    PropagationResult,
};
pub use request::{ConsumptionContext, FormulaUsage, OrderIntake};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use elast_catalog::{CompositionRegistry, Formula, Product};
use elast_core::{DomainError, DomainResult, Factor, FormulaId, IngredientId, ProductId, Quantity, StockRef};
use elast_events::{DiscardingBus, EventBus, EventEnvelope};
use elast_ledger::{LedgerEvent, Movement, Posting};

use crate::config::{ConfigError, EngineConfig};
use crate::inventory_guard::InventoryGuard;
use crate::ledger_store::{LedgerStorage, LedgerStore};
use crate::references::{ReferenceGenerator, SequentialOrderReferences};

/// Failures that abort a whole propagation call.
///
/// Anything below the top-level entity is reported per leg in the result
/// instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropagationError {
    #[error("invalid request: {0}")]
    Invalid(#[source] DomainError),

    #[error("cannot resolve composition: {0}")]
    Resolve(#[source] DomainError),

    #[error("append to {stock} failed: {source}")]
    Append {
        stock: StockRef,
        #[source]
        source: DomainError,
    },
}

/// Entry text shared by every leg of one propagation.
struct Leg<'a> {
    particulars: &'a str,
    formula_remarks: Option<String>,
    ingredient_remarks: Option<String>,
    occurred_at: DateTime<Utc>,
}

fn scaled(amount: Quantity, factor: Factor, what: &str) -> Result<Quantity, PropagationError> {
    amount
        .apportion(factor)
        .ok_or_else(|| PropagationError::Invalid(DomainError::invalid_quantity(format!("{what} overflows"))))
}

#[derive(Debug)]
pub struct PropagationEngine<C, S, B = DiscardingBus, G = SequentialOrderReferences> {
    catalog: C,
    store: LedgerStore<S, B>,
    references: G,
}

impl<C, S> PropagationEngine<C, S> {
    /// Default wiring: no event publication, `ELAST` order references.
    pub fn new(catalog: C, storage: S) -> Self {
        let config = EngineConfig::default();
        Self::with_parts(
            catalog,
            LedgerStore::new(storage).with_max_attempts(config.max_append_attempts),
            SequentialOrderReferences::new(config.order_reference_prefix),
        )
    }
}

impl<C, S, B> PropagationEngine<C, S, B> {
    pub fn from_config(catalog: C, storage: S, bus: B, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_parts(
            catalog,
            LedgerStore::with_bus(storage, bus).with_max_attempts(config.max_append_attempts),
            SequentialOrderReferences::new(config.order_reference_prefix.clone()),
        ))
    }
}

impl<C, S, B, G> PropagationEngine<C, S, B, G> {
    pub fn with_parts(catalog: C, store: LedgerStore<S, B>, references: G) -> Self {
        Self {
            catalog,
            store,
            references,
        }
    }

    pub fn store(&self) -> &LedgerStore<S, B> {
        &self.store
    }
}

impl<C, S, B, G> PropagationEngine<C, S, B, G>
where
    C: CompositionRegistry,
    S: LedgerStorage,
    B: EventBus<EventEnvelope<LedgerEvent>>,
    G: ReferenceGenerator,
{
    /// Consume `units` of a product and cascade the deduction.
    ///
    /// A missing product aborts before anything is written. Missing formulas
    /// or ingredients, and ingredients without enough stock, are reported in
    /// the result while their siblings proceed. Zero units writes nothing and
    /// reports every leg as a success at its current balance.
    pub fn propagate_consumption(
        &self,
        product_id: ProductId,
        units: Quantity,
        ctx: &ConsumptionContext,
    ) -> Result<PropagationResult, PropagationError> {
        units
            .ensure_non_negative("units consumed")
            .map_err(PropagationError::Invalid)?;
        let product = self.catalog.product(product_id).map_err(PropagationError::Resolve)?;

        let unit_weight = ctx.unit_weight.unwrap_or(product.unit_weight);
        let outward = scaled(units, unit_weight, "product outward")?;

        self.consume_product(&product, Movement::outward(outward), units, ctx)
    }

    /// Manual product stock transaction.
    ///
    /// The product ledger receives `movement` as given, in ledger quantity.
    /// Its outward side is converted back to units through the unit weight
    /// and cascades like [`propagate_consumption`](Self::propagate_consumption)
    /// of those units; inward stock touches the product ledger only. A zero
    /// unit weight cannot be converted and is rejected before any write.
    pub fn record_product_transaction(
        &self,
        product_id: ProductId,
        movement: Movement,
        ctx: &ConsumptionContext,
    ) -> Result<PropagationResult, PropagationError> {
        movement.validate().map_err(PropagationError::Invalid)?;
        let product = self.catalog.product(product_id).map_err(PropagationError::Resolve)?;

        let units = if movement.outward.is_zero() {
            Quantity::ZERO
        } else {
            let unit_weight = ctx.unit_weight.unwrap_or(product.unit_weight);
            movement.outward.per(unit_weight).ok_or_else(|| {
                PropagationError::Invalid(DomainError::invalid_quantity(format!(
                    "outward {} cannot be converted to units at unit weight {unit_weight}",
                    movement.outward
                )))
            })?
        };

        self.consume_product(&product, movement, units, ctx)
    }

    /// Take a production order: draw an order reference and consume the
    /// ordered quantity.
    pub fn fulfill_order(&self, order: &OrderIntake) -> Result<OrderFulfillment, PropagationError> {
        // Resolve first so an unknown product does not burn a reference.
        self.catalog
            .product(order.product_id)
            .map_err(PropagationError::Resolve)?;

        let order_reference = self.references.next_order_reference(order.occurred_at);
        let mut ctx = ConsumptionContext::new(
            format!("Order {order_reference} for {}", order.customer_name),
            order.occurred_at,
        );
        ctx.remarks = order.remarks.clone();
        ctx.unit_weight = order.weight_per_product;

        let result = self.propagate_consumption(order.product_id, order.quantity_ordered, &ctx)?;
        Ok(OrderFulfillment {
            order_reference,
            result,
        })
    }

    /// Direct batch run of a formula (no product involved).
    ///
    /// The formula ledger receives the produced compound as inward
    /// (`batch_weight × number_of_batches`); each ingredient is deducted
    /// `ratio × number_of_batches`.
    pub fn log_formula_usage(&self, usage: FormulaUsage) -> Result<FormulaUsageResult, PropagationError> {
        usage
            .number_of_batches
            .ensure_non_negative("number of batches")
            .map_err(PropagationError::Invalid)?;
        let formula = self
            .catalog
            .formula(usage.formula_id)
            .map_err(PropagationError::Resolve)?;

        let produced = scaled(usage.number_of_batches, usage.batch_weight, "batch output")?;
        let particulars = format!("Used in Order {}", usage.order_reference);
        let leg = Leg {
            particulars: &particulars,
            formula_remarks: usage.run_details(),
            ingredient_remarks: Some(format!(
                "Deduction for {} batches of formula {} Remarks:({})",
                usage.number_of_batches,
                formula.name,
                usage.remarks.as_deref().unwrap_or_default()
            )),
            occurred_at: usage.occurred_at,
        };

        let report = self.run_formula_leg(
            usage.formula_id,
            Ok(formula),
            Movement::inward(produced),
            usage.number_of_batches,
            &leg,
        );

        info!(
            formula = %usage.formula_id,
            batches = %usage.number_of_batches,
            order = %usage.order_reference,
            failed_ingredients = report.ingredients.iter().filter(|i| !i.outcome.is_success()).count(),
            "formula usage logged"
        );

        Ok(FormulaUsageResult {
            usage,
            formula: report,
        })
    }

    fn consume_product(
        &self,
        product: &Product,
        movement: Movement,
        units: Quantity,
        ctx: &ConsumptionContext,
    ) -> Result<PropagationResult, PropagationError> {
        let stock = StockRef::product(product.id);
        let posting = Posting::new(movement, ctx.particulars.as_str(), ctx.occurred_at).with_remarks(ctx.remarks.clone());
        let balance = self
            .commit(stock, &posting)
            .map_err(|source| PropagationError::Append { stock, source })?;

        let leg = Leg {
            particulars: &ctx.particulars,
            formula_remarks: ctx.remarks.clone(),
            ingredient_remarks: ctx.remarks.clone(),
            occurred_at: ctx.occurred_at,
        };

        let formulas: Vec<FormulaReport> = product
            .formulations
            .iter()
            .map(|line| match units.apportion(line.fill_weight) {
                Some(batches) => self.run_formula_leg(
                    line.formula_id,
                    self.catalog.formula(line.formula_id),
                    Movement::outward(batches),
                    batches,
                    &leg,
                ),
                None => FormulaReport {
                    formula_id: line.formula_id,
                    batches: Quantity::ZERO,
                    movement: Movement::default(),
                    outcome: Outcome::Failed {
                        reason: "formula consumption overflows".to_string(),
                    },
                    ingredients: Vec::new(),
                },
            })
            .collect();

        let result = PropagationResult {
            particulars: ctx.particulars.clone(),
            product: Some(ProductReport {
                product_id: product.id,
                movement,
                balance,
            }),
            formulas,
        };

        info!(
            product = %product.id,
            units = %units,
            particulars = %ctx.particulars,
            complete = result.is_complete(),
            "consumption propagated"
        );
        Ok(result)
    }

    /// Formula entry first, then its ingredients. If the formula entry cannot
    /// be written its ingredients are skipped.
    fn run_formula_leg(
        &self,
        formula_id: FormulaId,
        resolved: DomainResult<Formula>,
        movement: Movement,
        batches: Quantity,
        leg: &Leg<'_>,
    ) -> FormulaReport {
        let formula = match resolved {
            Ok(formula) => formula,
            // Nothing to write, so a dangling reference cannot fail the leg.
            Err(_) if movement.is_empty() => {
                let outcome = match self.store.balance(StockRef::formula(formula_id)) {
                    Ok(balance) => Outcome::Success { balance },
                    Err(err) => err.into(),
                };
                return FormulaReport {
                    formula_id,
                    batches,
                    movement,
                    outcome,
                    ingredients: Vec::new(),
                };
            }
            Err(err) => {
                warn!(formula = %formula_id, error = %err, "formula not resolved");
                return FormulaReport {
                    formula_id,
                    batches,
                    movement,
                    outcome: err.into(),
                    ingredients: Vec::new(),
                };
            }
        };

        let stock = StockRef::formula(formula_id);
        let posting = Posting::new(movement, leg.particulars, leg.occurred_at).with_remarks(leg.formula_remarks.clone());

        let (outcome, ingredients) = match self.commit(stock, &posting) {
            Ok(balance) => (
                Outcome::Success { balance },
                formula
                    .ingredients
                    .iter()
                    .map(|line| self.deduct_ingredient(line.ingredient_id, batches, line.ratio, leg))
                    .collect(),
            ),
            Err(err) => {
                warn!(formula = %formula_id, error = %err, "formula entry failed, skipping its ingredients");
                let skipped = formula
                    .ingredients
                    .iter()
                    .map(|line| IngredientReport {
                        ingredient_id: line.ingredient_id,
                        requested: batches.apportion(line.ratio).unwrap_or_default(),
                        outcome: Outcome::Skipped,
                    })
                    .collect();
                (Outcome::from(err), skipped)
            }
        };

        FormulaReport {
            formula_id,
            batches,
            movement,
            outcome,
            ingredients,
        }
    }

    fn deduct_ingredient(
        &self,
        ingredient_id: IngredientId,
        batches: Quantity,
        ratio: Factor,
        leg: &Leg<'_>,
    ) -> IngredientReport {
        let report = |requested: Quantity, outcome: Outcome| IngredientReport {
            ingredient_id,
            requested,
            outcome,
        };

        let Some(requested) = batches.apportion(ratio) else {
            return report(
                Quantity::ZERO,
                Outcome::Failed {
                    reason: "ingredient deduction overflows".to_string(),
                },
            );
        };

        let stock = StockRef::ingredient(ingredient_id);
        let result = if requested.is_zero() {
            self.store.balance(stock)
        } else if let Err(err) = self.catalog.ingredient(ingredient_id) {
            warn!(ingredient = %ingredient_id, error = %err, "ingredient not resolved");
            return report(requested, err.into());
        } else {
            InventoryGuard::new(&self.store)
                .check_and_reserve(
                    ingredient_id,
                    requested,
                    leg.particulars,
                    leg.ingredient_remarks.clone(),
                    leg.occurred_at,
                )
                .map(|entry| entry.balance())
        };

        match result {
            Ok(balance) => report(requested, Outcome::Success { balance }),
            Err(err) => {
                if !matches!(err, DomainError::InsufficientStock { .. }) {
                    warn!(ingredient = %ingredient_id, error = %err, "ingredient deduction failed");
                }
                report(requested, err.into())
            }
        }
    }

    /// Append a non-empty movement; an empty one writes nothing and reports
    /// the current balance.
    fn commit(&self, stock: StockRef, posting: &Posting) -> DomainResult<Quantity> {
        if posting.movement.is_empty() {
            return self.store.balance(stock);
        }
        self.store.append(stock, posting).map(|entry| entry.balance())
    }
}
