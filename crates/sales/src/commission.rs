//! Commission policy.

use serde::{Deserialize, Serialize};

use storefront_core::money::BPS_DENOMINATOR;
use storefront_core::{DomainError, DomainResult, Money, ValueObject};

/// Share of a sale's total attributed to the selling user, in basis points.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPolicy {
    pub rate_bps: u32,
}

impl ValueObject for CommissionPolicy {}

impl CommissionPolicy {
    /// 30%.
    pub const DEFAULT_RATE_BPS: u32 = 3_000;

    pub fn new(rate_bps: u32) -> DomainResult<Self> {
        if u64::from(rate_bps) > BPS_DENOMINATOR {
            return Err(DomainError::validation(
                "commission rate must be between 0 and 10000 basis points",
            ));
        }
        Ok(Self { rate_bps })
    }

    /// Commission owed on `total`, rounded half up to the minor unit.
    pub fn commission_on(&self, total: Money) -> Money {
        total.percentage_bps(self.rate_bps)
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            rate_bps: Self::DEFAULT_RATE_BPS,
        }
    }
}
