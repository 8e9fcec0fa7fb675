//! Error types for the DSC engine.
//!
//! Every failure is propagated to the caller. A mutating operation that returns
//! an error has had all of its local effects discarded.

use thiserror::Error;

use crate::core::health::HealthFactor;
use crate::utils::crypto::Address;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Collateral list and oracle list have different lengths
    #[error("Configuration mismatch: {collateral_types} collateral types, {oracle_bindings} oracle bindings")]
    ConfigurationMismatch {
        /// Number of collateral types supplied
        collateral_types: usize,
        /// Number of oracle bindings supplied
        oracle_bindings: usize,
    },

    /// The same collateral asset was registered twice
    #[error("Collateral {0} registered more than once")]
    DuplicateCollateral(Address),

    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount must be greater than zero
    #[error("Amount must be more than zero")]
    InvalidAmount,

    /// Collateral type is not registered
    #[error("Unsupported collateral: {0}")]
    UnsupportedCollateral(Address),

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Not enough collateral recorded for the requested decrease
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Requested amount
        required: u128,
        /// Recorded balance
        available: u128,
    },

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Settlement Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A downstream asset or token transfer was refused
    #[error("Transfer of {amount} {asset} from {from} to {to} failed")]
    TransferFailed {
        /// Asset or token that refused the transfer
        asset: Address,
        /// Source account
        from: Address,
        /// Destination account
        to: Address,
        /// Amount requested
        amount: u128,
    },

    /// The token authority refused to mint
    #[error("Mint of {amount} to {to} failed")]
    MintFailed {
        /// Recipient
        to: Address,
        /// Amount requested
        amount: u128,
    },

    /// Caller is not the authorized minter/burner
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Zero address used where a real account is required
    #[error("Zero address not allowed")]
    ZeroAddress,

    /// Burn amount larger than the burner's balance
    #[error("Burn amount {amount} exceeds balance {balance}")]
    BurnAmountExceedsBalance {
        /// Amount requested
        amount: u128,
        /// Current balance
        balance: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Health Factor Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Post-condition failed: account is at or below the minimum health factor
    #[error("Health factor broken: {0}")]
    HealthFactorBroken(HealthFactor),

    /// Liquidation attempted on a healthy account
    #[error("Health factor ok: {0}")]
    HealthFactorOk(HealthFactor),

    /// Liquidation did not improve the account
    #[error("Health factor not improved: started at {starting}, ended at {ending}")]
    HealthFactorNotImproved {
        /// Health factor before liquidation
        starting: HealthFactor,
        /// Health factor after liquidation
        ending: HealthFactor,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Oracle returned a stale, invalid or non-positive price
    #[error("Oracle price unavailable for feed {oracle}: {reason}")]
    OraclePriceUnavailable {
        /// Oracle binding that was queried
        oracle: Address,
        /// Why the price was rejected
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Execution Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A mutating entry point was re-entered during an in-flight call
    #[error("Reentrant call into {0}")]
    ReentrantCall(&'static str),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Returns true if resubmitting the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::OraclePriceUnavailable { .. } | Error::ReentrantCall(_) | Error::Lock
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Overflow { .. } | Error::Underflow { .. } | Error::Lock
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Configuration errors: 1xxx
            Error::ConfigurationMismatch { .. } => 1001,
            Error::DuplicateCollateral(_) => 1002,
            Error::Config(_) => 1003,

            // Validation errors: 2xxx
            Error::InvalidAmount => 2001,
            Error::UnsupportedCollateral(_) => 2002,
            Error::InvalidParameter { .. } => 2003,
            Error::InsufficientCollateral { .. } => 2004,
            Error::Overflow { .. } => 2005,
            Error::Underflow { .. } => 2006,

            // Settlement errors: 3xxx
            Error::TransferFailed { .. } => 3001,
            Error::MintFailed { .. } => 3002,
            Error::Unauthorized(_) => 3003,
            Error::ZeroAddress => 3004,
            Error::BurnAmountExceedsBalance { .. } => 3005,

            // Health factor errors: 4xxx
            Error::HealthFactorBroken(_) => 4001,
            Error::HealthFactorOk(_) => 4002,
            Error::HealthFactorNotImproved { .. } => 4003,

            // Oracle errors: 5xxx
            Error::OraclePriceUnavailable { .. } => 5001,

            // Execution errors: 9xxx
            Error::ReentrantCall(_) => 9001,
            Error::Lock => 9002,
            Error::Serialization(_) => 9003,
            Error::Deserialization(_) => 9004,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::ConfigurationMismatch { collateral_types: 1, oracle_bindings: 2 }.code(),
            Error::DuplicateCollateral(Address::ZERO).code(),
            Error::InvalidAmount.code(),
            Error::UnsupportedCollateral(Address::ZERO).code(),
            Error::TransferFailed {
                asset: Address::ZERO,
                from: Address::ZERO,
                to: Address::ZERO,
                amount: 0,
            }
            .code(),
            Error::MintFailed { to: Address::ZERO, amount: 0 }.code(),
            Error::HealthFactorBroken(HealthFactor::ZERO).code(),
            Error::HealthFactorOk(HealthFactor::ZERO).code(),
            Error::HealthFactorNotImproved {
                starting: HealthFactor::ZERO,
                ending: HealthFactor::ZERO,
            }
            .code(),
            Error::OraclePriceUnavailable { oracle: Address::ZERO, reason: "".into() }.code(),
            Error::ReentrantCall("deposit").code(),
            Error::Lock.code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_error_display() {
        let err = Error::ConfigurationMismatch { collateral_types: 1, oracle_bindings: 2 };
        assert!(err.to_string().contains("1 collateral types"));
        assert!(err.to_string().contains("2 oracle bindings"));

        let err = Error::HealthFactorBroken(HealthFactor::from_raw(500_000_000_000_000_000));
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn test_classification() {
        assert!(Error::Underflow { operation: "debt".into() }.is_critical());
        assert!(!Error::InvalidAmount.is_critical());
        assert!(Error::ReentrantCall("mint").is_retryable());
        assert!(!Error::HealthFactorOk(HealthFactor::MAX).is_retryable());
    }
}
