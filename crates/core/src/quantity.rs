//! Fixed-point stock quantities.
//!
//! Ledger arithmetic is done on integers (thousandths of a unit) so that a
//! running balance is an exact prefix sum and replaying a ledger always
//! reproduces the stored balances bit for bit.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Signed stock quantity in thousandths of a unit (e.g. grams for kg stock).
///
/// Balances may go negative for products and formulas; movement amounts
/// (inward/outward) are validated to be non-negative at the ledger boundary.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Number of stored sub-units per whole unit.
    pub const SCALE: i64 = 1000;

    pub const ZERO: Quantity = Quantity(0);

    pub const fn from_milli(milli: i64) -> Self {
        Self(milli)
    }

    /// Whole units. Saturates instead of overflowing.
    pub const fn from_units(units: i64) -> Self {
        Self(units.saturating_mul(Self::SCALE))
    }

    pub const fn as_milli(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Reject negative amounts with `InvalidQuantity`, naming the field.
    pub fn ensure_non_negative(self, field: &str) -> DomainResult<Self> {
        if self.is_negative() {
            return Err(DomainError::invalid_quantity(format!(
                "{field} must be non-negative (got {self})"
            )));
        }
        Ok(self)
    }

    /// Multiply by a per-unit factor, rounding half away from zero to the
    /// nearest thousandth. `None` on overflow.
    pub fn apportion(self, factor: Factor) -> Option<Quantity> {
        let scale = Self::SCALE as i128;
        let raw = self.0 as i128 * factor.0 as i128;
        let half = scale / 2;
        let rounded = if raw >= 0 {
            (raw + half) / scale
        } else {
            (raw - half) / scale
        };
        i64::try_from(rounded).ok().map(Self)
    }

    /// Inverse of [`apportion`](Self::apportion): how many units of
    /// `factor` make up this quantity, rounded half away from zero. `None`
    /// for a zero factor or on overflow.
    pub fn per(self, factor: Factor) -> Option<Quantity> {
        if factor.0 == 0 {
            return None;
        }
        let raw = self.0 as i128 * Self::SCALE as i128;
        let divisor = factor.0 as i128;
        let (quotient, remainder) = (raw / divisor, raw % divisor);
        let rounded = if 2 * remainder.abs() >= divisor {
            quotient + raw.signum()
        } else {
            quotient
        };
        i64::try_from(rounded).ok().map(Self)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = Self::SCALE as u64;
        write!(f, "{sign}{}.{:03}", abs / scale, abs % scale)
    }
}

/// Non-negative per-unit factor (ratio, fill weight, unit weight), in
/// thousandths.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Factor(i64);

impl Factor {
    pub const ZERO: Factor = Factor(0);
    pub const ONE: Factor = Factor(Quantity::SCALE);

    pub fn from_milli(milli: i64) -> DomainResult<Self> {
        if milli < 0 {
            return Err(DomainError::invalid_quantity(format!(
                "factor must be non-negative (got {milli} milli-units)"
            )));
        }
        Ok(Self(milli))
    }

    pub fn from_units(units: i64) -> DomainResult<Self> {
        let milli = units
            .checked_mul(Quantity::SCALE)
            .ok_or_else(|| DomainError::invalid_quantity("factor overflows"))?;
        Self::from_milli(milli)
    }

    pub const fn as_milli(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Factor {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_milli(value)
    }
}

impl From<Factor> for i64 {
    fn from(value: Factor) -> Self {
        value.0
    }
}

impl core::fmt::Display for Factor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&Quantity(self.0), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn apportion_whole_units() {
        let five = Quantity::from_units(5);
        let two = Factor::from_units(2).unwrap();
        assert_eq!(five.apportion(two), Some(Quantity::from_units(10)));
    }

    #[test]
    fn apportion_rounds_half_away_from_zero() {
        // 0.001 * 0.5 = 0.0005 -> 0.001
        let q = Quantity::from_milli(1);
        let half = Factor::from_milli(500).unwrap();
        assert_eq!(q.apportion(half), Some(Quantity::from_milli(1)));

        let neg = Quantity::from_milli(-1);
        assert_eq!(neg.apportion(half), Some(Quantity::from_milli(-1)));
    }

    #[test]
    fn apportion_overflow_is_none() {
        let big = Quantity::from_milli(i64::MAX);
        let ten = Factor::from_units(10).unwrap();
        assert_eq!(big.apportion(ten), None);
    }

    #[test]
    fn per_divides_by_factor() {
        let twenty = Quantity::from_units(20);
        assert_eq!(twenty.per(Factor::from_units(4).unwrap()), Some(Quantity::from_units(5)));
        // 1 / 3 = 0.333..., 2 / 3 = 0.666... -> 0.667
        let three = Factor::from_units(3).unwrap();
        assert_eq!(Quantity::from_units(1).per(three), Some(Quantity::from_milli(333)));
        assert_eq!(Quantity::from_units(2).per(three), Some(Quantity::from_milli(667)));
        assert_eq!(Quantity::from_units(-2).per(three), Some(Quantity::from_milli(-667)));
    }

    #[test]
    fn per_zero_factor_is_none() {
        assert_eq!(Quantity::from_units(1).per(Factor::ZERO), None);
    }

    #[test]
    fn negative_factor_is_rejected() {
        assert!(matches!(
            Factor::from_milli(-1),
            Err(DomainError::InvalidQuantity(_))
        ));
        assert!(serde_json::from_str::<Factor>("-5").is_err());
    }

    #[test]
    fn display_pads_fraction() {
        assert_eq!(Quantity::from_milli(12_050).to_string(), "12.050");
        assert_eq!(Quantity::from_milli(-1_500).to_string(), "-1.500");
        assert_eq!(Quantity::ZERO.to_string(), "0.000");
    }

    proptest! {
        /// Multiplying by one never changes a quantity.
        #[test]
        fn apportion_by_one_is_identity(milli in -1_000_000_000i64..1_000_000_000i64) {
            let q = Quantity::from_milli(milli);
            prop_assert_eq!(q.apportion(Factor::ONE), Some(q));
        }

        /// Dividing by a whole-unit factor undoes multiplying by it.
        #[test]
        fn per_undoes_whole_unit_apportion(milli in -1_000_000_000i64..1_000_000_000i64, units in 1i64..100) {
            let q = Quantity::from_milli(milli);
            let factor = Factor::from_units(units).unwrap();
            prop_assert_eq!(q.apportion(factor).and_then(|scaled| scaled.per(factor)), Some(q));
        }
    }
}
