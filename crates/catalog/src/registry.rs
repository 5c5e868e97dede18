//! Read-only composition lookups used by the propagation engine.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use elast_core::{DomainError, DomainResult, Factor, FormulaId, IngredientId, ProductId, StockKind};

use crate::model::{Formula, Ingredient, Product};

/// Product and formula registries.
///
/// Relations are resolved by id on every call; callers never hold object
/// graphs. Output order is the declaration order of the composition and is
/// stable across calls with no intervening catalog edit.
pub trait CompositionRegistry: Send + Sync {
    fn product(&self, id: ProductId) -> DomainResult<Product>;

    fn formula(&self, id: FormulaId) -> DomainResult<Formula>;

    fn ingredient(&self, id: IngredientId) -> DomainResult<Ingredient>;

    /// (formula, fill weight) pairs making one unit of the product.
    fn product_composition(&self, id: ProductId) -> DomainResult<Vec<(FormulaId, Factor)>> {
        Ok(self.product(id)?.composition())
    }

    /// (ingredient, ratio) pairs making one batch-unit of the formula.
    fn formula_composition(&self, id: FormulaId) -> DomainResult<Vec<(IngredientId, Factor)>> {
        Ok(self.formula(id)?.composition())
    }
}

impl<R> CompositionRegistry for Arc<R>
where
    R: CompositionRegistry + ?Sized,
{
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        (**self).product(id)
    }

    fn formula(&self, id: FormulaId) -> DomainResult<Formula> {
        (**self).formula(id)
    }

    fn ingredient(&self, id: IngredientId) -> DomainResult<Ingredient> {
        (**self).ingredient(id)
    }
}

/// In-memory catalog for tests/dev.
///
/// The `upsert_*` methods stand in for catalog management; the engine only
/// reads.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    formulas: RwLock<HashMap<FormulaId, Formula>>,
    ingredients: RwLock<HashMap<IngredientId, Ingredient>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_ingredient(&self, ingredient: Ingredient) {
        write(&self.ingredients).insert(ingredient.id, ingredient);
    }

    pub fn upsert_formula(&self, formula: Formula) {
        write(&self.formulas).insert(formula.id, formula);
    }

    pub fn upsert_product(&self, product: Product) {
        write(&self.products).insert(product.id, product);
    }
}

// A poisoned lock only means a writer panicked mid-insert of a whole record;
// the map itself is still valid.
fn read<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockReadGuard<'_, HashMap<K, V>> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<K, V>(lock: &RwLock<HashMap<K, V>>) -> std::sync::RwLockWriteGuard<'_, HashMap<K, V>> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl CompositionRegistry for InMemoryCatalog {
    fn product(&self, id: ProductId) -> DomainResult<Product> {
        read(&self.products)
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(StockKind::Product, id))
    }

    fn formula(&self, id: FormulaId) -> DomainResult<Formula> {
        read(&self.formulas)
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(StockKind::Formula, id))
    }

    fn ingredient(&self, id: IngredientId) -> DomainResult<Ingredient> {
        read(&self.ingredients)
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(StockKind::Ingredient, id))
    }
}
