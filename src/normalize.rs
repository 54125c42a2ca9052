//! Symbol and direction normalization shared across broker parsers.

use regex::Regex;
use std::sync::LazyLock;

use crate::model::Direction;

static FUTURES_CONTRACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{1,4})[FGHJKMNQUVXZ]\d{1,2}$").unwrap());

static FUTURES_CONTRACT_SPACED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]{1,4})\s+\d{2}-\d{2}$").unwrap());

/// Uppercases, trims, and — for futures-style contract codes — strips the
/// month/year suffix down to the root symbol (`ESH4` -> `ES`,
/// `MGC 03-24` -> `MGC`). Idempotent.
pub fn normalize_symbol(raw: &str) -> String {
    let trimmed = raw.trim().to_uppercase();
    if let Some(caps) = FUTURES_CONTRACT.captures(&trimmed) {
        return caps[1].to_string();
    }
    if let Some(caps) = FUTURES_CONTRACT_SPACED.captures(&trimmed) {
        return caps[1].to_string();
    }
    trimmed
}

const LONG_KEYWORDS: &[&str] = &["buy", "long", "b", "1", "call"];
const SHORT_KEYWORDS: &[&str] = &["sell", "short", "s", "-1", "put", "ss"];

/// Case-insensitive substring match against the canonical keyword lists,
/// first match in listed order wins.
pub fn parse_direction_keyword(value: &str) -> Option<Direction> {
    let lowered = value.trim().to_lowercase();
    if LONG_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Some(Direction::Long);
    }
    if SHORT_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return Some(Direction::Short);
    }
    None
}

/// Direction implied by a signed quantity when no textual direction field
/// is present. Returns the direction and the absolute quantity magnitude.
pub fn direction_from_sign(quantity: rust_decimal::Decimal) -> Direction {
    if quantity.is_sign_negative() {
        Direction::Short
    } else {
        Direction::Long
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_month_year_suffix() {
        assert_eq!(normalize_symbol("ESH4"), "ES");
        assert_eq!(normalize_symbol("MNQZ5"), "MNQ");
    }

    #[test]
    fn strips_spaced_contract_suffix() {
        assert_eq!(normalize_symbol("MGC 03-24"), "MGC");
    }

    #[test]
    fn plain_symbol_unchanged_but_uppercased() {
        assert_eq!(normalize_symbol(" aapl "), "AAPL");
    }

    #[test]
    fn normalization_is_idempotent() {
        for s in ["ESH4", "MGC 03-24", "aapl", "eurusd"] {
            let once = normalize_symbol(s);
            let twice = normalize_symbol(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn direction_keyword_first_match_wins() {
        assert_eq!(parse_direction_keyword("Buy"), Some(Direction::Long));
        assert_eq!(parse_direction_keyword("SELL"), Some(Direction::Short));
        assert_eq!(parse_direction_keyword("b"), Some(Direction::Long));
        assert_eq!(parse_direction_keyword("unknown"), None);
    }

    #[test]
    fn direction_from_sign_flips_on_negative() {
        use rust_decimal_macros::dec;
        assert_eq!(direction_from_sign(dec!(5)), Direction::Long);
        assert_eq!(direction_from_sign(dec!(-5)), Direction::Short);
    }
}
