//! Fixed-point arithmetic and mathematical utilities.
//!
//! All monetary quantities are unsigned integers scaled by a documented factor.
//! Every multiply-then-divide goes through a 256-bit intermediate so that the
//! product cannot wrap before the division.

use primitive_types::U256;
use rust_decimal::Decimal;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128, operation: &str) -> Result<u128> {
    a.checked_add(b).ok_or_else(|| Error::Overflow {
        operation: operation.to_string(),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u128, b: u128, operation: &str) -> Result<u128> {
    a.checked_sub(b).ok_or_else(|| Error::Underflow {
        operation: operation.to_string(),
    })
}

/// Safe multiplication with overflow check
pub fn safe_mul(a: u128, b: u128, operation: &str) -> Result<u128> {
    a.checked_mul(b).ok_or_else(|| Error::Overflow {
        operation: operation.to_string(),
    })
}

/// Computes `(a * b) / c` with a 256-bit intermediate, truncating toward zero
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }

    let result = U256::from(a) * U256::from(b) / U256::from(c);
    u128::try_from(result).map_err(|_| Error::Overflow {
        operation: format!("({} * {}) / {}", a, b, c),
    })
}

/// Applies a percentage (100 = 100%) to an amount, truncating
pub fn apply_percentage(amount: u128, pct: u128) -> Result<u128> {
    mul_div(amount, pct, crate::utils::constants::PERCENT_DIVISOR)
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT FORMATTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Formats a scaled integer as a decimal string, trimming trailing zeros
pub fn format_fixed(raw: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = raw / unit;
    let frac = raw % unit;

    if frac == 0 {
        return whole.to_string();
    }

    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Converts a human-readable decimal into a scaled integer
///
/// Digits beyond `decimals` are truncated.
pub fn to_fixed(value: Decimal, decimals: u32) -> Result<u128> {
    if value.is_sign_negative() {
        return Err(Error::InvalidParameter {
            name: "amount".into(),
            reason: format!("{} is negative", value),
        });
    }

    let whole = value.trunc();
    let frac = value - whole;

    let unit = 10u128.pow(decimals);
    let whole: u128 = whole.mantissa().unsigned_abs() / 10u128.pow(whole.scale());
    let whole = safe_mul(whole, unit, "to_fixed")?;

    let frac_scale = frac.scale();
    let frac_digits = frac.mantissa().unsigned_abs();
    let frac = if frac_scale > decimals {
        frac_digits / 10u128.pow(frac_scale - decimals)
    } else {
        frac_digits * 10u128.pow(decimals - frac_scale)
    };

    safe_add(whole, frac, "to_fixed")
}

/// Converts a scaled integer into a decimal, if it fits
pub fn from_fixed(raw: u128, decimals: u32) -> Option<Decimal> {
    let mantissa = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, decimals).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_safe_arithmetic() {
        assert_eq!(safe_add(1, 2, "add").unwrap(), 3);
        assert!(safe_add(u128::MAX, 1, "add").is_err());

        assert_eq!(safe_sub(5, 3, "sub").unwrap(), 2);
        assert!(matches!(safe_sub(3, 5, "sub"), Err(Error::Underflow { .. })));

        assert!(safe_mul(u128::MAX, 2, "mul").is_err());
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // a * b overflows u128 but the quotient fits
        let a = u128::MAX / 2;
        assert_eq!(mul_div(a, 4, 4).unwrap(), a);
        assert_eq!(mul_div(7, 3, 2).unwrap(), 10); // truncates 10.5

        assert!(matches!(mul_div(u128::MAX, 2, 1), Err(Error::Overflow { .. })));
        assert!(mul_div(1, 1, 0).is_err());
    }

    #[test]
    fn test_apply_percentage() {
        assert_eq!(apply_percentage(1_000, 10).unwrap(), 100);
        assert_eq!(apply_percentage(15, 50).unwrap(), 7);
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(30_000 * 10u128.pow(18), 18), "30000");
        assert_eq!(format_fixed(5 * 10u128.pow(16), 18), "0.05");
        assert_eq!(format_fixed(1, 18), "0.000000000000000001");
        assert_eq!(format_fixed(0, 18), "0");
    }

    #[test]
    fn test_to_fixed() {
        let value = Decimal::from_str("0.05").unwrap();
        assert_eq!(to_fixed(value, 18).unwrap(), 5 * 10u128.pow(16));

        let value = Decimal::from_str("2000").unwrap();
        assert_eq!(to_fixed(value, 8).unwrap(), 2000 * 10u128.pow(8));

        let value = Decimal::from_str("1.123456789").unwrap();
        assert_eq!(to_fixed(value, 2).unwrap(), 112);

        assert!(to_fixed(Decimal::from_str("-1").unwrap(), 18).is_err());
    }

    #[test]
    fn test_from_fixed() {
        let value = from_fixed(15 * 10u128.pow(17), 18).unwrap();
        assert_eq!(value, Decimal::from_str("1.5").unwrap());
        assert!(from_fixed(u128::MAX, 18).is_none());
    }
}
