//! Shared parser abstraction: a per-broker strategy (`BrokerParser`) plus
//! the pipeline every broker shares — decode, split, map columns, check
//! required columns, iterate rows, sort. Replaces the source system's
//! inheritance chain (`BaseParser` -> per-broker subclass) with a
//! strategy interface plus free helper functions (spec §9).

mod row;

pub mod binance;
pub mod fill_aggregator;
pub mod generic;
pub mod interactive_brokers;
pub mod metatrader;
pub mod ninja_trader;
pub mod tradovate;

pub use row::RowView;

use chrono::NaiveDateTime;

use crate::encoding::decode_bytes;
use crate::error::RowError;
use crate::model::{Broker, TradeCollection};

/// Outcome of parsing one file: the trades that were recovered plus the
/// row-level errors and informational warnings collected along the way.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub trades: TradeCollection,
    pub errors: Vec<RowError>,
    pub warnings: Vec<String>,
    pub total_rows: usize,
    pub parsed_successfully: usize,
    pub skipped_rows: usize,
    fatal: bool,
}

impl ParseResult {
    fn empty() -> Self {
        Self {
            trades: TradeCollection::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            total_rows: 0,
            parsed_successfully: 0,
            skipped_rows: 0,
            fatal: false,
        }
    }

    fn fatal(message: impl Into<String>) -> Self {
        let mut result = Self::empty();
        result.fatal = true;
        result.errors.push(RowError::new(0, message));
        result
    }

    /// `false` iff a file-level error (unreadable encoding, unreadable
    /// CSV structure, missing required columns) aborted the whole parse.
    pub fn success(&self) -> bool {
        !self.fatal
    }

    /// Percentage of rows that turned into a trade, to one implied
    /// decimal of precision (the caller formats as needed).
    pub fn success_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 0.0;
        }
        (self.parsed_successfully as f64 / self.total_rows as f64) * 100.0
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn add_error(&mut self, err: RowError) {
        self.errors.push(err);
    }

    fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Per-broker parsing strategy. The shared pipeline (`parse_bytes`,
/// `parse_text`) drives these hooks in order; everything broker-specific
/// lives behind this trait.
pub trait BrokerParser {
    fn broker(&self) -> Broker;

    /// Canonical field names that must be resolvable (by canonical name
    /// or known alias, after `column_mapping` renames headers) for the
    /// file to be parseable at all.
    fn required_columns(&self) -> &[&str];

    /// `(source alias, canonical field name)` pairs, matched
    /// case-insensitively against the file's header row.
    fn column_mapping(&self) -> &[(&str, &str)];

    /// Hook for broker-specific table pre-processing before row
    /// iteration (e.g. Interactive Brokers stripping embedded duplicate
    /// header rows). Default: no-op.
    fn normalize_rows(&self, headers: &[String], rows: Vec<csv::StringRecord>) -> Vec<csv::StringRecord> {
        let _ = headers;
        rows
    }

    /// Parses one data row. `Ok(None)` means "skip, not an error"
    /// (pending orders, bookkeeping rows); `Err` is a row-level error
    /// that does not abort the parse.
    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<crate::model::Trade>, RowError>;

    /// Hook run once after all rows have been parsed, before the final
    /// sort (e.g. Binance/Tradovate fill aggregation). Default: no-op.
    fn postprocess(&self, _result: &mut ParseResult) {}
}

/// Parses raw bytes, decoding with the encoding fallback list first.
pub fn parse_bytes(
    parser: &dyn BrokerParser,
    bytes: &[u8],
    source_name: Option<&str>,
    account_id: Option<&str>,
) -> ParseResult {
    match decode_bytes(bytes) {
        Some(text) => parse_text(parser, &text, source_name, account_id),
        None => ParseResult::fatal("failed to decode input with any known encoding"),
    }
}

/// Parses already-decoded text.
pub fn parse_text(
    parser: &dyn BrokerParser,
    text: &str,
    source_name: Option<&str>,
    account_id: Option<&str>,
) -> ParseResult {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header_record = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return ParseResult::fatal(format!("failed to read CSV structure: {e}")),
        None => return ParseResult::fatal("empty file: no header row"),
    };

    let original_headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();
    let canonical_headers = apply_column_mapping(&original_headers, parser.column_mapping());

    let missing = missing_required_columns(&canonical_headers, parser.required_columns());
    if !missing.is_empty() {
        return ParseResult::fatal(format!("missing required columns: {}", missing.join(", ")));
    }

    let mut data_rows = Vec::new();
    for record in records {
        match record {
            Ok(r) => data_rows.push(r),
            Err(e) => return ParseResult::fatal(format!("failed to read CSV structure: {e}")),
        }
    }
    let total_rows = data_rows.len();
    let data_rows = parser.normalize_rows(&canonical_headers, data_rows);

    let mut result = ParseResult::empty();
    result.total_rows = total_rows;
    result.trades.source_file = source_name.map(str::to_string);
    result.trades.broker_name = Some(parser.broker());

    for (idx, record) in data_rows.iter().enumerate() {
        let row_number = idx + 2; // header counts as row 1
        let view = RowView::new(&original_headers, &canonical_headers, record);

        if view.is_empty_row() {
            result.skipped_rows += 1;
            continue;
        }

        match parser.parse_row(&view, row_number) {
            Ok(Some(mut trade)) => {
                trade.account_id = account_id.map(str::to_string);
                trade.broker_name = Some(parser.broker());
                result.trades.trades.push(trade);
                result.parsed_successfully += 1;
            }
            Ok(None) => result.skipped_rows += 1,
            Err(err) => result.add_error(err),
        }
    }

    parser.postprocess(&mut result);

    result
        .trades
        .trades
        .sort_by_key(|a| a.entry_time);

    result
}

fn apply_column_mapping(headers: &[String], mapping: &[(&str, &str)]) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            mapping
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(h))
                .map(|(_, canonical)| canonical.to_string())
                .unwrap_or_else(|| h.clone())
        })
        .collect()
}

fn missing_required_columns(canonical_headers: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|req| !canonical_headers.iter().any(|h| h.eq_ignore_ascii_case(req)))
        .map(|s| s.to_string())
        .collect()
}

/// Floors a timestamp to the start of its containing bucket (spec §4.6
/// "floor(entry_time, 1 min)", generalized to a configurable duration).
pub(crate) fn floor_to_bucket(ts: NaiveDateTime, bucket: std::time::Duration) -> NaiveDateTime {
    let bucket_secs = bucket.as_secs().max(1) as i64;
    let epoch_secs = ts.and_utc().timestamp();
    let floored = epoch_secs.div_euclid(bucket_secs) * bucket_secs;
    chrono::DateTime::from_timestamp(floored, 0).unwrap().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_columns_reports_unmapped() {
        let headers = vec!["symbol".to_string(), "quantity".to_string()];
        let missing = missing_required_columns(&headers, &["symbol", "direction", "quantity"]);
        assert_eq!(missing, vec!["direction".to_string()]);
    }

    #[test]
    fn column_mapping_is_case_insensitive() {
        let headers = vec!["Open Time".to_string(), "Type".to_string()];
        let mapping = [("open time", "entry_time"), ("type", "direction")];
        let mapped = apply_column_mapping(&headers, &mapping);
        assert_eq!(mapped, vec!["entry_time".to_string(), "direction".to_string()]);
    }
}
