//! Collateral valuation.
//!
//! Converts between collateral amounts and USD values using oracle prices:
//!
//! ```text
//! value  = price * PRICE_SCALE * amount / VALUE_SCALE
//! amount = value * VALUE_SCALE / (price * PRICE_SCALE)
//! ```
//!
//! The division is the single source of rounding and always truncates, so the
//! two conversions are inverses only to within one unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::core::ledger::{AccountPosition, CollateralAmount, CollateralRegistry};
use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::oracle::adapter::{checked_price, PriceOracleAdapter};
use crate::utils::constants::{PRICE_SCALE, VALUE_SCALE};
use crate::utils::crypto::AssetId;
use crate::utils::math::{format_fixed, mul_div, safe_mul};

// ═══════════════════════════════════════════════════════════════════════════════
// USD VALUE
// ═══════════════════════════════════════════════════════════════════════════════

/// USD value with 18 decimals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct UsdValue(u128);

impl UsdValue {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// Create from a scaled value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole dollars
    pub const fn from_units(units: u128) -> Self {
        Self(units * VALUE_SCALE)
    }

    /// Get raw value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", format_fixed(self.0, 18))
    }
}

impl From<TokenAmount> for UsdValue {
    /// The stable token is pegged 1:1 to USD
    fn from(amount: TokenAmount) -> Self {
        Self(amount.raw())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PURE CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// USD value of `amount` at an 8-decimal `price`
pub fn usd_value(price: u128, amount: CollateralAmount) -> Result<UsdValue> {
    let adjusted_price = safe_mul(price, PRICE_SCALE, "price scaling")?;
    mul_div(adjusted_price, amount.raw(), VALUE_SCALE).map(UsdValue)
}

/// Collateral amount worth `value` at an 8-decimal `price`
pub fn amount_from_usd(price: u128, value: UsdValue) -> Result<CollateralAmount> {
    let adjusted_price = safe_mul(price, PRICE_SCALE, "price scaling")?;
    mul_div(value.raw(), VALUE_SCALE, adjusted_price).map(CollateralAmount::from_raw)
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUATION SERVICE
// ═══════════════════════════════════════════════════════════════════════════════

/// Valuation over a registry and its oracle bindings
#[derive(Clone, Copy)]
pub struct Valuation<'a> {
    registry: &'a CollateralRegistry,
    oracle: &'a dyn PriceOracleAdapter,
}

impl<'a> Valuation<'a> {
    /// Create a valuation service
    pub fn new(registry: &'a CollateralRegistry, oracle: &'a dyn PriceOracleAdapter) -> Self {
        Self { registry, oracle }
    }

    /// Validated price of a registered asset
    pub fn price_of(&self, asset: &AssetId) -> Result<u128> {
        let oracle = self.registry.ensure_supported(asset)?;
        checked_price(self.oracle, &oracle)
    }

    /// USD value of `amount` of `asset`
    pub fn value_of(&self, asset: &AssetId, amount: CollateralAmount) -> Result<UsdValue> {
        let price = self.price_of(asset)?;
        let value = usd_value(price, amount)?;
        debug!(asset = %asset.short(), %amount, %value, "Valued collateral");
        Ok(value)
    }

    /// Amount of `asset` worth `value`
    pub fn amount_for(&self, asset: &AssetId, value: UsdValue) -> Result<CollateralAmount> {
        let price = self.price_of(asset)?;
        let amount = amount_from_usd(price, value)?;
        debug!(asset = %asset.short(), %value, %amount, "Converted USD to collateral");
        Ok(amount)
    }

    /// Total USD value of a position, summed over every registered type in order
    pub fn total_collateral_value(&self, position: &AccountPosition) -> Result<UsdValue> {
        let mut total = UsdValue::ZERO;

        for asset in self.registry.collateral_types() {
            let value = self.value_of(asset, position.collateral_of(asset))?;
            total = total.checked_add(value).ok_or_else(|| Error::Overflow {
                operation: "total collateral value".into(),
            })?;
        }

        Ok(total)
    }
}

impl fmt::Debug for Valuation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Valuation")
            .field("collateral_types", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::price_feed::InMemoryPriceFeed;
    use crate::utils::crypto::Address;

    const ETH_PRICE: i128 = 2000_0000_0000;

    fn weth() -> AssetId {
        Address::from_label("weth")
    }

    fn wbtc() -> AssetId {
        Address::from_label("wbtc")
    }

    fn setup() -> (CollateralRegistry, InMemoryPriceFeed) {
        let registry = CollateralRegistry::register(
            &[weth(), wbtc()],
            &[Address::from_label("eth-usd"), Address::from_label("btc-usd")],
        )
        .unwrap();

        let feed = InMemoryPriceFeed::new();
        feed.set_price(Address::from_label("eth-usd"), ETH_PRICE).unwrap();
        feed.set_price(Address::from_label("btc-usd"), 1000_0000_0000).unwrap();
        (registry, feed)
    }

    #[test]
    fn test_value_of() {
        let (registry, feed) = setup();
        let valuation = Valuation::new(&registry, &feed);

        let value = valuation.value_of(&weth(), CollateralAmount::from_units(15)).unwrap();
        assert_eq!(value, UsdValue::from_units(30_000));
    }

    #[test]
    fn test_amount_for() {
        let (registry, feed) = setup();
        let valuation = Valuation::new(&registry, &feed);

        let amount = valuation.amount_for(&weth(), UsdValue::from_units(100)).unwrap();
        assert_eq!(amount, CollateralAmount::from_raw(5 * 10u128.pow(16)));
    }

    #[test]
    fn test_amount_for_truncates() {
        // $1 at $3 per unit is 0.333... units
        let amount = amount_from_usd(3_0000_0000, UsdValue::from_units(1)).unwrap();
        assert_eq!(amount.raw(), 333_333_333_333_333_333);

        let back = usd_value(3_0000_0000, amount).unwrap();
        assert_eq!(back.raw(), VALUE_SCALE - 1);
    }

    #[test]
    fn test_total_collateral_value() {
        let (registry, feed) = setup();
        let valuation = Valuation::new(&registry, &feed);

        let mut position = AccountPosition::default();
        position.collateral_balances.insert(weth(), CollateralAmount::from_units(1));
        position.collateral_balances.insert(wbtc(), CollateralAmount::from_units(2));

        let total = valuation.total_collateral_value(&position).unwrap();
        assert_eq!(total, UsdValue::from_units(4_000));
    }

    #[test]
    fn test_unsupported_asset() {
        let (registry, feed) = setup();
        let valuation = Valuation::new(&registry, &feed);

        let result = valuation.value_of(&Address::from_label("doge"), CollateralAmount::from_units(1));
        assert!(matches!(result, Err(Error::UnsupportedCollateral(_))));
    }

    #[test]
    fn test_bad_price_propagates() {
        let (registry, feed) = setup();
        feed.set_price(Address::from_label("eth-usd"), -5).unwrap();
        let valuation = Valuation::new(&registry, &feed);

        let result = valuation.value_of(&weth(), CollateralAmount::from_units(1));
        assert!(matches!(result, Err(Error::OraclePriceUnavailable { .. })));
    }
}
