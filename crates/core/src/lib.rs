//! `elast-core`: shared building blocks for the stock ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, fixed-point quantities, stock-entity references and the domain
//! error model.

pub mod error;
pub mod id;
pub mod quantity;
pub mod stock;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use id::{EntryId, FormulaId, IngredientId, ProductId};
pub use quantity::{Factor, Quantity};
pub use stock::{StockKind, StockRef};
pub use version::ExpectedVersion;
