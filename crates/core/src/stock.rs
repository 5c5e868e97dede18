//! Stock-bearing entity kinds and references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::{FormulaId, IngredientId, ProductId};

/// The fixed set of entity kinds that own a ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockKind {
    Product,
    Formula,
    Ingredient,
}

impl StockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StockKind::Product => "product",
            StockKind::Formula => "formula",
            StockKind::Ingredient => "ingredient",
        }
    }
}

impl core::fmt::Display for StockKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a ledger: kind + stable id.
///
/// Ids are unique within a kind only, so the kind is part of the key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StockRef {
    pub kind: StockKind,
    pub id: Uuid,
}

impl StockRef {
    pub fn product(id: ProductId) -> Self {
        Self {
            kind: StockKind::Product,
            id: id.into(),
        }
    }

    pub fn formula(id: FormulaId) -> Self {
        Self {
            kind: StockKind::Formula,
            id: id.into(),
        }
    }

    pub fn ingredient(id: IngredientId) -> Self {
        Self {
            kind: StockKind::Ingredient,
            id: id.into(),
        }
    }
}

impl From<ProductId> for StockRef {
    fn from(value: ProductId) -> Self {
        Self::product(value)
    }
}

impl From<FormulaId> for StockRef {
    fn from(value: FormulaId) -> Self {
        Self::formula(value)
    }
}

impl From<IngredientId> for StockRef {
    fn from(value: IngredientId) -> Self {
        Self::ingredient(value)
    }
}

impl core::fmt::Display for StockRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
