//! Catalog module: products, formulas, ingredients and their compositions.
//!
//! Compositions are bills of materials expressed as id + per-unit factor.
//! Catalog editing is owned elsewhere; this crate exposes read-only lookups.

pub mod model;
pub mod registry;

pub use model::{Formula, FormulaIngredient, Formulation, Ingredient, Product};
pub use registry::{CompositionRegistry, InMemoryCatalog};
