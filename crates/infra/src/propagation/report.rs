use serde::{Deserialize, Serialize};

use elast_core::{DomainError, FormulaId, IngredientId, ProductId, Quantity};
use elast_ledger::Movement;

use super::request::FormulaUsage;

/// Result of one ledger leg (formula or ingredient) of a propagation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Appended (or nothing to append); `balance` is the ledger balance afterwards.
    Success { balance: Quantity },
    InsufficientStock { available: Quantity, requested: Quantity },
    NotFound,
    /// Contention on the ledger outlasted the retry budget.
    Conflict { reason: String },
    /// The amount or the entry was unusable.
    Failed { reason: String },
    /// Not attempted because the upstream formula entry could not be written.
    Skipped,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn balance(&self) -> Option<Quantity> {
        match self {
            Outcome::Success { balance } => Some(*balance),
            _ => None,
        }
    }
}

impl From<DomainError> for Outcome {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InsufficientStock { available, requested } => {
                Outcome::InsufficientStock { available, requested }
            }
            DomainError::NotFound { .. } => Outcome::NotFound,
            DomainError::Conflict(reason) => Outcome::Conflict { reason },
            other => Outcome::Failed {
                reason: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientReport {
    pub ingredient_id: IngredientId,
    pub requested: Quantity,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaReport {
    pub formula_id: FormulaId,
    /// Batch quantity that drives the ingredient deductions.
    pub batches: Quantity,
    /// What was (or would have been) written to the formula ledger.
    pub movement: Movement,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub ingredients: Vec<IngredientReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReport {
    pub product_id: ProductId,
    pub movement: Movement,
    pub balance: Quantity,
}

/// Aggregate result of a propagation: which legs succeeded and which did not.
///
/// Successful legs are committed; nothing is rolled back when a sibling fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationResult {
    pub particulars: String,
    pub product: Option<ProductReport>,
    pub formulas: Vec<FormulaReport>,
}

impl PropagationResult {
    pub fn product_balance(&self) -> Option<Quantity> {
        self.product.as_ref().map(|p| p.balance)
    }

    /// New balance of every formula whose entry was written.
    pub fn formula_balances(&self) -> Vec<(FormulaId, Quantity)> {
        self.formulas
            .iter()
            .filter_map(|f| f.outcome.balance().map(|b| (f.formula_id, b)))
            .collect()
    }

    pub fn ingredient_outcomes(&self) -> impl Iterator<Item = &IngredientReport> {
        self.formulas.iter().flat_map(|f| f.ingredients.iter())
    }

    pub fn outcome_for(&self, ingredient_id: IngredientId) -> Option<&Outcome> {
        self.ingredient_outcomes()
            .find(|i| i.ingredient_id == ingredient_id)
            .map(|i| &i.outcome)
    }

    /// True when every formula and ingredient leg succeeded.
    pub fn is_complete(&self) -> bool {
        self.formulas
            .iter()
            .all(|f| f.outcome.is_success() && f.ingredients.iter().all(|i| i.outcome.is_success()))
    }

    pub fn failed_ingredients(&self) -> Vec<&IngredientReport> {
        self.ingredient_outcomes().filter(|i| !i.outcome.is_success()).collect()
    }
}

/// Result of a direct formula usage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaUsageResult {
    pub usage: FormulaUsage,
    pub formula: FormulaReport,
}

/// Result of an order entering production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFulfillment {
    pub order_reference: String,
    pub result: PropagationResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_serialize_with_tag() {
        let report = IngredientReport {
            ingredient_id: IngredientId::new(),
            requested: Quantity::from_units(30),
            outcome: Outcome::InsufficientStock {
                available: Quantity::from_units(20),
                requested: Quantity::from_units(30),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "insufficient_stock");
        assert_eq!(json["available"], 20_000);
    }

    #[test]
    fn domain_errors_map_to_outcomes() {
        let missing = DomainError::not_found(elast_core::StockKind::Ingredient, IngredientId::new());
        assert_eq!(Outcome::from(missing), Outcome::NotFound);
        assert_eq!(
            Outcome::from(DomainError::conflict("busy")),
            Outcome::Conflict {
                reason: "busy".to_string()
            }
        );
        assert!(matches!(
            Outcome::from(DomainError::validation("bad entry")),
            Outcome::Failed { reason } if reason.contains("bad entry")
        ));
    }
}
