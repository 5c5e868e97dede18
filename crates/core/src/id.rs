//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a finished product (article).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(Uuid);

/// Identifier of a rubber/chemical formula (compound recipe).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaId(Uuid);

/// Identifier of a raw-material ingredient.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(Uuid);

/// Identifier of a single ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

/// Ids print as a bare UUID. Parsing also accepts the `<kind>:<uuid>` form
/// that ledger refs print, as long as the kind matches.
macro_rules! impl_uuid_newtype {
    ($t:ident, $label:literal) => {
        impl $t {
            /// Lowercase label used in ledger refs and parse errors.
            pub const LABEL: &'static str = $label;

            /// New time-ordered (UUIDv7) identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_labelled(s, $label).map(Self)
            }
        }
    };
}

fn parse_labelled(s: &str, label: &str) -> Result<Uuid, DomainError> {
    let raw = match s.split_once(':') {
        Some((kind, rest)) if kind == label => rest,
        Some((kind, _)) => {
            return Err(DomainError::validation(format!(
                "expected a {label} id, got a {kind} ref '{s}'"
            )));
        }
        None => s,
    };
    Uuid::from_str(raw.trim()).map_err(|e| DomainError::validation(format!("malformed {label} id '{s}': {e}")))
}

impl_uuid_newtype!(ProductId, "product");
impl_uuid_newtype!(FormulaId, "formula");
impl_uuid_newtype!(IngredientId, "ingredient");
impl_uuid_newtype!(EntryId, "entry");
