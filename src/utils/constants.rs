//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT SCALES
// ═══════════════════════════════════════════════════════════════════════════════

/// System fixed-point unit (18 decimals); USD values and health factors use it
pub const VALUE_SCALE: u128 = 1_000_000_000_000_000_000;

/// Decimals carried by oracle answers
pub const FEED_DECIMALS: u32 = 8;

/// Lifts an 8-decimal oracle answer to the 18-decimal system unit
pub const PRICE_SCALE: u128 = 10_000_000_000;

/// Decimals of the stable token and of every supported collateral asset
pub const TOKEN_DECIMALS: u32 = 18;

/// Percentage divisor (100 = 100%)
pub const PERCENT_DIVISOR: u128 = 100;

// ═══════════════════════════════════════════════════════════════════════════════
// SOLVENCY PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of collateral value counted toward solvency - 50%
/// Equivalent to requiring 200% overcollateralization
pub const LIQUIDATION_THRESHOLD_PCT: u128 = 50;

/// Extra collateral awarded to liquidators - 10%
pub const LIQUIDATION_BONUS_PCT: u128 = 10;

/// Minimum health factor (1.0 in 18-decimal fixed point)
pub const MIN_HEALTH_FACTOR: u128 = VALUE_SCALE;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age of an oracle answer before it is considered stale (3 hours)
pub const PRICE_FEED_TIMEOUT_SECS: i64 = 3 * 60 * 60;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account/asset/oracle address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Maximum notifications retained in the engine's event log
pub const MAX_RETAINED_EVENTS: usize = 1000;
