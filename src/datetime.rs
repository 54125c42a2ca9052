//! Tolerant multi-format timestamp parsing for broker exports.
//!
//! Brokers disagree on everything: separators, whether seconds are
//! present, whether the value is a Unix timestamp, whether there's a
//! trailing `Z`. We try a bounded, ordered list of formats and fall back
//! to epoch-seconds/milliseconds heuristics before giving up.

use chrono::{NaiveDateTime, TimeZone, Utc};

use crate::error::DateTimeError;

const FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y.%m.%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y-%m-%d",
];

/// Parses a broker-formatted timestamp into a naive (timezone-less) instant.
///
/// A trailing `Z` is treated as UTC and converted to its naive instant.
/// Values that round-trip as an integer are treated as epoch seconds,
/// or epoch milliseconds when the magnitude is at least 10^12.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, DateTimeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DateTimeError::Empty);
    }

    if let Some(stripped) = trimmed.strip_suffix('Z')
        && let Ok(naive) = try_formats(stripped.trim()) {
            return Ok(naive);
        }

    if let Ok(naive) = try_formats(trimmed) {
        return Ok(naive);
    }

    if let Ok(epoch) = trimmed.parse::<i64>() {
        return parse_epoch(epoch);
    }

    Err(DateTimeError::InvalidDateTime(trimmed.to_string()))
}

fn try_formats(value: &str) -> Result<NaiveDateTime, ()> {
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap());
    }
    Err(())
}

fn parse_epoch(epoch: i64) -> Result<NaiveDateTime, DateTimeError> {
    let (secs, nanos) = if epoch.unsigned_abs() >= 1_000_000_000_000 {
        (epoch / 1000, ((epoch % 1000).unsigned_abs() as u32) * 1_000_000)
    } else {
        (epoch, 0)
    };
    Utc.timestamp_opt(secs, nanos)
        .single()
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DateTimeError::InvalidDateTime(epoch.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ndt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_iso_with_t() {
        assert_eq!(
            parse_datetime("2024-01-15T10:30:00").unwrap(),
            ndt(2024, 1, 15, 10, 30, 0)
        );
    }

    #[test]
    fn parses_iso_with_z_as_utc() {
        assert_eq!(
            parse_datetime("2024-01-15T10:30:00Z").unwrap(),
            ndt(2024, 1, 15, 10, 30, 0)
        );
    }

    #[test]
    fn parses_space_separated() {
        assert_eq!(
            parse_datetime("2024-01-15 10:30:00").unwrap(),
            ndt(2024, 1, 15, 10, 30, 0)
        );
    }

    #[test]
    fn parses_slash_dmy() {
        assert_eq!(
            parse_datetime("15/01/2024 10:30:00").unwrap(),
            ndt(2024, 1, 15, 10, 30, 0)
        );
    }

    #[test]
    fn parses_dotted_mt4_format() {
        assert_eq!(
            parse_datetime("2024.01.15 10:30:00").unwrap(),
            ndt(2024, 1, 15, 10, 30, 0)
        );
    }

    #[test]
    fn parses_date_only() {
        assert_eq!(parse_datetime("2024-01-15").unwrap(), ndt(2024, 1, 15, 0, 0, 0));
    }

    #[test]
    fn parses_epoch_seconds() {
        let expected = ndt(2021, 1, 1, 0, 0, 0);
        let secs = expected.and_utc().timestamp();
        assert_eq!(parse_datetime(&secs.to_string()).unwrap(), expected);
    }

    #[test]
    fn parses_epoch_millis() {
        let expected = ndt(2021, 1, 1, 0, 0, 0);
        let millis = expected.and_utc().timestamp_millis();
        assert_eq!(parse_datetime(&millis.to_string()).unwrap(), expected);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_datetime("not a date"),
            Err(DateTimeError::InvalidDateTime(_))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(parse_datetime(""), Err(DateTimeError::Empty)));
    }
}
