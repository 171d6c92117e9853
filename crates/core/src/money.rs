//! Currency amounts.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// An amount of money in the smallest currency unit (e.g. cents).
///
/// Single-currency by construction; arithmetic is checked so overflow surfaces
/// as a validation failure instead of wrapping.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(amount: u64) -> Self {
        Self(amount)
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    pub fn checked_mul(self, factor: u64) -> DomainResult<Money> {
        self.0
            .checked_mul(factor)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Fraction of this amount expressed in basis points, rounded half up.
    pub fn percentage_bps(self, bps: u32) -> Money {
        let scaled = u128::from(self.0) * u128::from(bps);
        let denom = u128::from(BPS_DENOMINATOR);
        let rounded = (scaled + denom / 2) / denom;
        // Rates above 100% can exceed u64.
        Money(u64::try_from(rounded).unwrap_or(u64::MAX))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.map(|m| m.0).fold(0u64, u64::saturating_add))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn thirty_percent_rounds_half_up() {
        assert_eq!(Money::from_minor(1000).percentage_bps(3000), Money::from_minor(300));
        // 0.3 * 5 = 1.5 -> 2
        assert_eq!(Money::from_minor(5).percentage_bps(3000), Money::from_minor(2));
        // 0.3 * 3 = 0.9 -> 1
        assert_eq!(Money::from_minor(3).percentage_bps(3000), Money::from_minor(1));
        assert_eq!(Money::ZERO.percentage_bps(3000), Money::ZERO);
    }

    #[test]
    fn displays_major_and_minor_units() {
        assert_eq!(Money::from_minor(12345).to_string(), "123.45");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
    }

    #[test]
    fn overflow_is_a_validation_error() {
        let err = Money::from_minor(u64::MAX).checked_add(Money::from_minor(1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(Money::from_minor(u64::MAX).checked_mul(2).is_err());
    }

    proptest! {
        #[test]
        fn percentage_never_exceeds_amount(amount in 0u64..1_000_000_000_000, bps in 0u32..=10_000) {
            let part = Money::from_minor(amount).percentage_bps(bps);
            prop_assert!(part <= Money::from_minor(amount));
        }
    }
}
