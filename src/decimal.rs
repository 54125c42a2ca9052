//! Tolerant parsing of broker-formatted numeric strings into exact
//! `rust_decimal::Decimal` values. `Decimal` already gives us fixed-point,
//! exact arithmetic; this module only handles the messy textual input
//! brokers actually export (thousands separators, currency sigils,
//! parenthesized negatives).

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::NumberError;

/// Parses a broker-formatted number.
///
/// Accepts a leading `$`, `,` thousands separators, and parenthesized
/// negatives (`(123.45)` -> `-123.45`). When `allow_negative` is `false`,
/// a negative result is rejected rather than silently flipped.
pub fn parse_decimal(value: &str, allow_negative: bool) -> Result<Decimal, NumberError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(NumberError::Empty);
    }

    let (negative_paren, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();

    let parsed = Decimal::from_str(cleaned.trim())
        .map_err(|_| NumberError::InvalidNumber(trimmed.to_string()))?;

    let result = if negative_paren { -parsed } else { parsed };

    if !allow_negative && result.is_sign_negative() && !result.is_zero() {
        return Err(NumberError::NegativeDisallowed(result.to_string()));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_decimal("123.45", true).unwrap(), dec!(123.45));
    }

    #[test]
    fn strips_thousands_separator() {
        assert_eq!(parse_decimal("1,234.56", true).unwrap(), dec!(1234.56));
    }

    #[test]
    fn strips_currency_sigil() {
        assert_eq!(parse_decimal("$42.00", true).unwrap(), dec!(42.00));
    }

    #[test]
    fn parenthesized_is_negative() {
        assert_eq!(parse_decimal("(99.50)", true).unwrap(), dec!(-99.50));
    }

    #[test]
    fn leading_minus_is_negative() {
        assert_eq!(parse_decimal("-10", true).unwrap(), dec!(-10));
    }

    #[test]
    fn rejects_negative_when_disallowed() {
        assert!(matches!(
            parse_decimal("-10", false),
            Err(NumberError::NegativeDisallowed(_))
        ));
    }

    #[test]
    fn zero_is_not_negative() {
        assert!(parse_decimal("0", false).is_ok());
        assert!(parse_decimal("-0", false).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_decimal("not-a-number", true),
            Err(NumberError::InvalidNumber(_))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(parse_decimal("   ", true), Err(NumberError::Empty)));
    }
}
