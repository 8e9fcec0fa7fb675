//! DSC Command Line Interface.
//!
//! Quote helpers over the pure valuation functions and an in-memory scenario
//! runner for exercising the engine end to end.

pub mod output;
pub mod scenario;

pub use output::*;
pub use scenario::*;

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::health::{calculate_health_factor, HealthFactor};
use crate::core::ledger::CollateralAmount;
use crate::core::token::TokenAmount;
use crate::core::valuation::{amount_from_usd, usd_value, UsdValue};
use crate::error::{Error, Result};
use crate::utils::constants::{FEED_DECIMALS, TOKEN_DECIMALS};
use crate::utils::math::to_fixed;

// ═══════════════════════════════════════════════════════════════════════════════
// INPUT PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a human-readable decimal such as "1.5"
pub fn parse_decimal(input: &str, name: &str) -> Result<Decimal> {
    Decimal::from_str(input.trim()).map_err(|e| Error::InvalidParameter {
        name: name.into(),
        reason: format!("{:?}: {}", input, e),
    })
}

/// Parse an 18-decimal token or collateral amount
pub fn parse_units(input: &str, name: &str) -> Result<u128> {
    to_fixed(parse_decimal(input, name)?, TOKEN_DECIMALS)
}

/// Parse a USD price into the feed's 8-decimal answer
pub fn parse_price(input: &str) -> Result<i128> {
    let raw = to_fixed(parse_decimal(input, "price")?, FEED_DECIMALS)?;
    i128::try_from(raw).map_err(|_| Error::Overflow {
        operation: "price".into(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTES
// ═══════════════════════════════════════════════════════════════════════════════

/// USD value of `amount` collateral units at a USD `price`
pub fn quote_value(price: &str, amount: &str) -> Result<UsdValue> {
    let price = parse_price(price)?;
    let amount = CollateralAmount::from_raw(parse_units(amount, "amount")?);
    usd_value(price.unsigned_abs(), amount)
}

/// Collateral units worth `usd` at a USD `price`
pub fn quote_amount(price: &str, usd: &str) -> Result<CollateralAmount> {
    let price = parse_price(price)?;
    if price == 0 {
        return Err(Error::InvalidParameter {
            name: "price".into(),
            reason: "must be positive".into(),
        });
    }
    let value = UsdValue::from_raw(parse_units(usd, "usd")?);
    amount_from_usd(price.unsigned_abs(), value)
}

/// Health factor of `debt` backed by `collateral_usd`
pub fn quote_health(collateral_usd: &str, debt: &str, threshold_pct: u128) -> Result<HealthFactor> {
    let collateral = UsdValue::from_raw(parse_units(collateral_usd, "collateral_usd")?);
    let debt = TokenAmount::from_raw(parse_units(debt, "debt")?);
    calculate_health_factor(collateral, debt, threshold_pct)
}
