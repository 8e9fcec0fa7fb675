//! Input validation utilities.
//!
//! Checks applied at the public entry points before any state is touched.

use crate::error::{Error, Result};
use crate::utils::constants::PERCENT_DIVISOR;
use crate::utils::crypto::Address;

/// Validate that an amount is non-zero
pub fn validate_non_zero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

/// Validate that an address is not the zero address
pub fn validate_address(address: &Address) -> Result<()> {
    if address.is_zero() {
        return Err(Error::ZeroAddress);
    }
    Ok(())
}

/// Validate a percentage lies in `[min, 100]`
pub fn validate_percentage(value: u128, min: u128, name: &str) -> Result<()> {
    if value < min || value > PERCENT_DIVISOR {
        return Err(Error::InvalidParameter {
            name: name.into(),
            reason: format!("{}% outside [{}%, {}%]", value, min, PERCENT_DIVISOR),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_zero() {
        assert!(validate_non_zero(1).is_ok());
        assert_eq!(validate_non_zero(0), Err(Error::InvalidAmount));
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address(&Address::from_label("bob")).is_ok());
        assert_eq!(validate_address(&Address::ZERO), Err(Error::ZeroAddress));
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage(50, 1, "threshold").is_ok());
        assert!(validate_percentage(0, 1, "threshold").is_err());
        assert!(validate_percentage(101, 0, "bonus").is_err());
    }
}
