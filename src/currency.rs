//! Conversions between amounts, raw cent strings and the European display form
//! (`1.234,56`).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Width of the HUB-3 amount field.
pub const HUB3_AMOUNT_WIDTH: usize = 15;

const THOUSANDS_SEPARATOR: char = '.';
const DECIMAL_SEPARATOR: char = ',';

/// Formats a raw cent string for display, e.g. `"123456"` -> `"1.234,56"`.
///
/// Non-digit characters in the input are ignored.
pub fn to_display(cents: &str) -> String {
    let digits: String = cents.chars().filter(char::is_ascii_digit).collect();
    let padded = format!("{:0>3}", digits);
    let (integer, fraction) = padded.split_at(padded.len() - 2);

    let integer = integer.trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(THOUSANDS_SEPARATOR);
        }
        grouped.push(c);
    }

    format!("{}{}{}", grouped, DECIMAL_SEPARATOR, fraction)
}

/// Reads a display string back into raw cents by dropping every non-digit.
pub fn to_cents(display: &str) -> String {
    display.chars().filter(char::is_ascii_digit).collect()
}

/// Converts a decimal amount to whole cents, truncating sub-cent digits.
///
/// The sign is checked after truncation, so `-0.001` is zero cents.
pub fn decimal_to_cents(amount: Decimal) -> Result<u64, ValidationError> {
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| ValidationError::AmountTooLarge(amount.to_string()))?
        .trunc();
    if cents.is_zero() {
        return Ok(0);
    }
    if cents.is_sign_negative() {
        return Err(ValidationError::NegativeAmount(amount.to_string()));
    }
    cents
        .to_u64()
        .ok_or_else(|| ValidationError::AmountTooLarge(amount.to_string()))
}

/// Formats a decimal amount as the zero-padded 15-digit HUB-3 amount field.
pub fn for_hub3(amount: Decimal) -> Result<String, ValidationError> {
    let cents = decimal_to_cents(amount)?.to_string();
    if cents.len() > HUB3_AMOUNT_WIDTH {
        return Err(ValidationError::AmountTooLarge(amount.to_string()));
    }
    Ok(format!("{:0>width$}", cents, width = HUB3_AMOUNT_WIDTH))
}

/// Display form of a decimal amount, e.g. `25.5` -> `"25,50"`.
pub fn display_amount(amount: Decimal) -> Result<String, ValidationError> {
    Ok(to_display(&decimal_to_cents(amount)?.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_display() {
        assert_eq!(to_display("123456"), "1.234,56");
        assert_eq!(to_display("5"), "0,05");
        assert_eq!(to_display(""), "0,00");
        assert_eq!(to_display("100"), "1,00");
        assert_eq!(to_display("123456789"), "1.234.567,89");
        assert_eq!(to_display("000000000002500"), "25,00");
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents("1.234,56"), "123456");
        assert_eq!(to_cents("0,05 EUR"), "005");
    }

    #[test]
    fn test_display_cents_inverse() {
        for s in ["0,00", "1,00", "999,99", "1.234,56", "12.345.678,90", "100.000,01"] {
            assert_eq!(to_display(&to_cents(s)), s);
        }
    }

    #[test]
    fn test_for_hub3() {
        assert_eq!(for_hub3(dec!(25.00)).unwrap(), "000000000002500");
        assert_eq!(for_hub3(dec!(0)).unwrap(), "000000000000000");
        assert_eq!(for_hub3(dec!(1234.567)).unwrap(), "000000000123456");
        assert_eq!(for_hub3(dec!(9999999999999.99)).unwrap(), "999999999999999");
    }

    #[test]
    fn test_for_hub3_rejects_out_of_range() {
        assert!(matches!(
            for_hub3(dec!(-1.00)),
            Err(ValidationError::NegativeAmount(_))
        ));
        assert!(matches!(
            for_hub3(dec!(10000000000000.00)),
            Err(ValidationError::AmountTooLarge(_))
        ));
    }

    #[test]
    fn test_for_hub3_overflowing_amount() {
        assert_eq!(
            for_hub3(Decimal::MAX),
            Err(ValidationError::AmountTooLarge(Decimal::MAX.to_string()))
        );
        assert!(matches!(
            decimal_to_cents(Decimal::MAX),
            Err(ValidationError::AmountTooLarge(_))
        ));
    }

    #[test]
    fn test_sub_cent_negative_truncates_to_zero() {
        assert_eq!(decimal_to_cents(dec!(-0.001)).unwrap(), 0);
        assert_eq!(for_hub3(dec!(-0.009)).unwrap(), "000000000000000");
        assert!(matches!(
            decimal_to_cents(dec!(-0.01)),
            Err(ValidationError::NegativeAmount(_))
        ));
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(dec!(25.5)).unwrap(), "25,50");
        assert_eq!(display_amount(dec!(1500)).unwrap(), "1.500,00");
    }
}
