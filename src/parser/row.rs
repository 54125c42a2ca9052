//! Typed, case-insensitive access to one CSV row against a
//! per-file header -> index map, replacing the dynamic dict-style row
//! access of the source system (spec §9: "typed header->index map
//! instead of dynamic dict access").

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::datetime::parse_datetime;
use crate::decimal::parse_decimal;
use crate::error::RowError;

pub struct RowView<'a> {
    original_headers: &'a [String],
    canonical_headers: &'a [String],
    record: &'a csv::StringRecord,
}

impl<'a> RowView<'a> {
    pub fn new(original_headers: &'a [String], canonical_headers: &'a [String], record: &'a csv::StringRecord) -> Self {
        Self {
            original_headers,
            canonical_headers,
            record,
        }
    }

    /// Looks up a field by its canonical (post-mapping) name. Returns
    /// `None` for a missing column or a blank/whitespace-only cell.
    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.canonical_headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(canonical))
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// First present field among several candidate canonical names.
    pub fn get_any(&self, canonicals: &[&str]) -> Option<&str> {
        canonicals.iter().find_map(|c| self.get(c))
    }

    pub fn is_empty_row(&self) -> bool {
        self.record.iter().all(|v| v.trim().is_empty())
    }

    /// Untyped snapshot of the row keyed by original (pre-mapping) header
    /// names, for `Trade::raw_data`.
    pub fn raw_snapshot(&self) -> BTreeMap<String, String> {
        self.original_headers
            .iter()
            .zip(self.record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect()
    }

    pub fn required_str(&self, canonical: &str, row_number: usize) -> Result<&str, RowError> {
        self.get(canonical)
            .ok_or_else(|| RowError::new(row_number, format!("{canonical} is required")).with_column(canonical))
    }

    pub fn decimal(&self, canonical: &str, row_number: usize, allow_negative: bool) -> Result<Option<Decimal>, RowError> {
        match self.get(canonical) {
            None => Ok(None),
            Some(raw) => parse_decimal(raw, allow_negative)
                .map(Some)
                .map_err(|e| RowError::new(row_number, e.to_string()).with_column(canonical).with_raw_value(raw)),
        }
    }

    pub fn required_decimal(&self, canonical: &str, row_number: usize, allow_negative: bool) -> Result<Decimal, RowError> {
        let raw = self.required_str(canonical, row_number)?;
        parse_decimal(raw, allow_negative)
            .map_err(|e| RowError::new(row_number, e.to_string()).with_column(canonical).with_raw_value(raw))
    }

    pub fn datetime(&self, canonical: &str, row_number: usize) -> Result<Option<NaiveDateTime>, RowError> {
        match self.get(canonical) {
            None => Ok(None),
            Some(raw) => parse_datetime(raw)
                .map(Some)
                .map_err(|e| RowError::new(row_number, e.to_string()).with_column(canonical).with_raw_value(raw)),
        }
    }

    pub fn required_datetime(&self, canonical: &str, row_number: usize) -> Result<NaiveDateTime, RowError> {
        let raw = self.required_str(canonical, row_number)?;
        parse_datetime(raw)
            .map_err(|e| RowError::new(row_number, e.to_string()).with_column(canonical).with_raw_value(raw))
    }
}
