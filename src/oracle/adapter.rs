//! Price oracle adapter interface.
//!
//! The engine consumes one oracle per collateral type and trusts its answer
//! once validated. An invalid or non-positive answer is reported as
//! [`Error::OraclePriceUnavailable`]; adapter errors propagate unmodified.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::crypto::OracleId;

/// Raw answer returned by an oracle adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAnswer {
    /// USD price with the feed's native decimals (8)
    pub price: i128,
    /// Whether the adapter considers the answer fresh and consistent
    pub valid: bool,
}

impl PriceAnswer {
    /// A valid answer
    pub fn valid(price: i128) -> Self {
        Self { price, valid: true }
    }

    /// An answer flagged as stale or inconsistent
    pub fn invalid(price: i128) -> Self {
        Self { price, valid: false }
    }
}

/// Source of the latest price for a collateral type
pub trait PriceOracleAdapter: Send + Sync {
    /// Latest answer for `oracle`
    fn latest_price(&self, oracle: &OracleId) -> Result<PriceAnswer>;
}

/// Query `adapter` and return a usable price, or why there is none
pub fn checked_price(adapter: &dyn PriceOracleAdapter, oracle: &OracleId) -> Result<u128> {
    let unavailable = |reason: String| Error::OraclePriceUnavailable {
        oracle: *oracle,
        reason,
    };

    let answer = adapter.latest_price(oracle)?;

    if !answer.valid {
        return Err(unavailable("stale or inconsistent round".into()));
    }
    if answer.price <= 0 {
        return Err(unavailable(format!("non-positive price {}", answer.price)));
    }

    u128::try_from(answer.price).map_err(|_| unavailable("price out of range".into()))
}
