//! Domain error model.

use thiserror::Error;

use crate::quantity::Quantity;
use crate::stock::StockKind;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (quantities,
/// lookups, stock sufficiency, contention). Infrastructure concerns belong
/// elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A negative (or overflowing) quantity was supplied.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A referenced product, formula or ingredient does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: StockKind, id: String },

    /// An ingredient balance cannot cover the requested deduction.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        available: Quantity,
        requested: Quantity,
    },

    /// Contention on a single ledger (stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DomainError {
    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn not_found(kind: StockKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn insufficient_stock(available: Quantity, requested: Quantity) -> Self {
        Self::InsufficientStock {
            available,
            requested,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
