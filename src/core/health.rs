//! Health factor computation and the solvency gate.
//!
//! ```text
//! adjusted = collateral_value * LIQUIDATION_THRESHOLD_PCT / 100
//! ratio    = adjusted * VALUE_SCALE / debt
//! ```
//!
//! An account without debt is maximally healthy. Classification is recomputed on
//! demand; no status is stored.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::core::config::EngineParams;
use crate::core::ledger::AccountPosition;
use crate::core::token::TokenAmount;
use crate::core::valuation::{UsdValue, Valuation};
use crate::error::{Error, Result};
use crate::utils::constants::VALUE_SCALE;
use crate::utils::math::{apply_percentage, format_fixed, mul_div};

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH FACTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Solvency ratio with 18 decimals (1e18 = 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct HealthFactor(u128);

impl HealthFactor {
    /// Worst possible ratio
    pub const ZERO: Self = Self(0);

    /// Ratio of an account without debt
    pub const MAX: Self = Self(u128::MAX);

    /// Create from a scaled ratio
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Get raw value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Check for the no-debt sentinel
    pub fn is_max(&self) -> bool {
        *self == Self::MAX
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_max() {
            return write!(f, "max");
        }
        write!(f, "{}", format_fixed(self.0, 18))
    }
}

/// Solvency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Above the minimum, or no debt
    Healthy,
    /// At or below the minimum with debt outstanding
    AtRisk,
}

impl AccountStatus {
    /// Classify a ratio against a minimum
    pub fn classify(health_factor: HealthFactor, min: HealthFactor) -> Self {
        if health_factor > min {
            AccountStatus::Healthy
        } else {
            AccountStatus::AtRisk
        }
    }

    /// Check if liquidation is permitted
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, AccountStatus::AtRisk)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Healthy => write!(f, "healthy"),
            AccountStatus::AtRisk => write!(f, "at risk"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CALCULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Health factor of `debt` backed by `collateral_value`
///
/// Returns [`HealthFactor::MAX`] when there is no debt. A ratio too large to
/// represent saturates to the same value.
pub fn calculate_health_factor(
    collateral_value: UsdValue,
    debt: TokenAmount,
    threshold_pct: u128,
) -> Result<HealthFactor> {
    if debt.is_zero() {
        return Ok(HealthFactor::MAX);
    }

    let adjusted = apply_percentage(collateral_value.raw(), threshold_pct)?;
    match mul_div(adjusted, VALUE_SCALE, debt.raw()) {
        Ok(ratio) => Ok(HealthFactor(ratio)),
        Err(Error::Overflow { .. }) => Ok(HealthFactor::MAX),
        Err(e) => Err(e),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH CHECK
// ═══════════════════════════════════════════════════════════════════════════════

/// Health computations over a valuation and the engine's parameters
#[derive(Debug, Clone, Copy)]
pub struct HealthCheck<'a> {
    valuation: Valuation<'a>,
    params: &'a EngineParams,
}

impl<'a> HealthCheck<'a> {
    /// Create a health check
    pub fn new(valuation: Valuation<'a>, params: &'a EngineParams) -> Self {
        Self { valuation, params }
    }

    /// Health factor of a position
    pub fn health_factor(&self, position: &AccountPosition) -> Result<HealthFactor> {
        if !position.has_debt() {
            return Ok(HealthFactor::MAX);
        }

        let collateral_value = self.valuation.total_collateral_value(position)?;
        let health_factor = calculate_health_factor(
            collateral_value,
            position.debt_minted,
            self.params.liquidation_threshold_pct,
        )?;

        debug!(
            %collateral_value,
            debt = %position.debt_minted,
            %health_factor,
            "Computed health factor"
        );
        Ok(health_factor)
    }

    /// Classify a position
    pub fn status(&self, position: &AccountPosition) -> Result<AccountStatus> {
        if !position.has_debt() {
            return Ok(AccountStatus::Healthy);
        }
        let health_factor = self.health_factor(position)?;
        Ok(AccountStatus::classify(health_factor, self.params.min_health_factor))
    }

    /// Fail with [`Error::HealthFactorBroken`] if a position with debt is at or
    /// below the minimum
    pub fn assert_healthy(&self, position: &AccountPosition) -> Result<HealthFactor> {
        let health_factor = self.health_factor(position)?;
        if position.has_debt() && health_factor <= self.params.min_health_factor {
            return Err(Error::HealthFactorBroken(health_factor));
        }
        Ok(health_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ledger::{CollateralAmount, CollateralRegistry};
    use crate::oracle::price_feed::InMemoryPriceFeed;
    use crate::utils::constants::LIQUIDATION_THRESHOLD_PCT;
    use crate::utils::crypto::Address;

    fn position(collateral_units: u128, debt_units: u128) -> AccountPosition {
        let mut position = AccountPosition::default();
        position
            .collateral_balances
            .insert(Address::from_label("weth"), CollateralAmount::from_units(collateral_units));
        position.debt_minted = TokenAmount::from_units(debt_units);
        position
    }

    #[test]
    fn test_calculate_health_factor() {
        // $200 collateral at 50% against $100 debt is exactly 1.0
        let hf = calculate_health_factor(
            UsdValue::from_units(200),
            TokenAmount::from_units(100),
            LIQUIDATION_THRESHOLD_PCT,
        )
        .unwrap();
        assert_eq!(hf, HealthFactor::from_raw(VALUE_SCALE));

        let hf = calculate_health_factor(
            UsdValue::from_units(100),
            TokenAmount::from_units(100),
            LIQUIDATION_THRESHOLD_PCT,
        )
        .unwrap();
        assert_eq!(hf.to_string(), "0.5");
    }

    #[test]
    fn test_zero_debt_is_max() {
        let hf = calculate_health_factor(UsdValue::ZERO, TokenAmount::ZERO, 50).unwrap();
        assert!(hf.is_max());
        assert_eq!(hf.to_string(), "max");
    }

    #[test]
    fn test_tiny_debt_saturates() {
        let hf = calculate_health_factor(
            UsdValue::from_raw(u128::MAX),
            TokenAmount::from_raw(1),
            LIQUIDATION_THRESHOLD_PCT,
        )
        .unwrap();
        assert_eq!(hf, HealthFactor::MAX);
    }

    #[test]
    fn test_status_classification() {
        let min = HealthFactor::from_raw(VALUE_SCALE);
        assert_eq!(AccountStatus::classify(HealthFactor::from_raw(VALUE_SCALE + 1), min), AccountStatus::Healthy);
        assert_eq!(AccountStatus::classify(min, min), AccountStatus::AtRisk);
        assert!(AccountStatus::AtRisk.is_liquidatable());
    }

    #[test]
    fn test_assert_healthy() {
        let registry =
            CollateralRegistry::register(&[Address::from_label("weth")], &[Address::from_label("eth-usd")])
                .unwrap();
        let feed = InMemoryPriceFeed::new();
        feed.set_price(Address::from_label("eth-usd"), 2000_0000_0000).unwrap();
        let params = EngineParams::default();
        let check = HealthCheck::new(Valuation::new(&registry, &feed), &params);

        // 1 WETH = $2000, counts as $1000
        assert!(check.assert_healthy(&position(1, 999)).is_ok());
        assert!(matches!(
            check.assert_healthy(&position(1, 1000)),
            Err(Error::HealthFactorBroken(hf)) if hf == HealthFactor::from_raw(VALUE_SCALE)
        ));

        // No debt, no collateral
        assert_eq!(check.status(&position(0, 0)).unwrap(), AccountStatus::Healthy);
        assert_eq!(check.health_factor(&position(0, 0)).unwrap(), HealthFactor::MAX);
        assert_eq!(check.status(&position(1, 1000)).unwrap(), AccountStatus::AtRisk);
    }
}
