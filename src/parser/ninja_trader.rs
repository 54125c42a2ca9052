//! NinjaTrader 8 Trade Performance export parser: P&L arrives pre-computed
//! per row, futures symbols carry a month/year suffix (spec §4.4
//! "NinjaTrader").

use regex::Regex;
use std::sync::LazyLock;

use crate::error::RowError;
use crate::model::{AssetType, Broker, Direction, Status, Trade};

use super::{BrokerParser, RowView};

pub struct NinjaTraderParser;

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("trade #", "trade_number"),
    ("instrument", "symbol"),
    ("account", "account"),
    ("strategy", "strategy"),
    ("market pos.", "direction"),
    ("market position", "direction"),
    ("quantity", "quantity"),
    ("qty", "quantity"),
    ("entry price", "entry_price"),
    ("exit price", "exit_price"),
    ("entry time", "entry_time"),
    ("exit time", "exit_time"),
    ("entry name", "entry_name"),
    ("exit name", "exit_name"),
    ("profit", "pnl"),
    ("cum. profit", "cumulative_pnl"),
    ("commission", "commission"),
    ("mae", "mae"),
    ("mfe", "mfe"),
    ("etd", "etd"),
    ("bars", "bars"),
];

const REQUIRED: &[&str] = &["symbol", "quantity", "entry_price", "exit_price"];

const FUTURES_SYMBOLS: &[&str] = &[
    "ES", "NQ", "YM", "RTY", "CL", "GC", "SI", "NG", "6E", "6J", "6B", "6A", "ZB", "ZN", "ZF", "ZT", "MES", "MNQ",
    "MYM", "M2K",
];

static FUTURES_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z]+)\s*\d{2}-?\d{2}$").unwrap());

fn normalize_nt_symbol(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = FUTURES_SUFFIX.captures(trimmed) {
        return caps[1].to_uppercase();
    }
    trimmed.to_uppercase()
}

fn detect_nt_asset_type(symbol: &str) -> AssetType {
    let base = normalize_nt_symbol(symbol);
    if FUTURES_SYMBOLS.contains(&base.as_str()) {
        return AssetType::Future;
    }
    if symbol.len() == 6 && symbol.chars().all(|c| c.is_ascii_alphabetic()) {
        return AssetType::Forex;
    }
    AssetType::Future
}

impl BrokerParser for NinjaTraderParser {
    fn broker(&self) -> Broker {
        Broker::NinjaTrader
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        COLUMN_MAPPING
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        let Some(symbol_raw) = row.get("symbol") else {
            return Ok(None);
        };
        let symbol = normalize_nt_symbol(symbol_raw);

        let Some(direction_raw) = row.get("direction") else {
            return Ok(None);
        };
        let lowered = direction_raw.to_lowercase();
        let direction = if lowered.contains("long") {
            Direction::Long
        } else if lowered.contains("short") {
            Direction::Short
        } else {
            return Err(RowError::new(row_number, format!("unknown direction: {direction_raw}")).with_column("direction"));
        };

        let quantity = row.required_decimal("quantity", row_number, false)?;
        if quantity.is_zero() || quantity.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid quantity: {quantity}")).with_column("quantity"));
        }

        let entry_price = row.required_decimal("entry_price", row_number, false)?;
        if entry_price.is_zero() || entry_price.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid entry price: {entry_price}")).with_column("entry_price"));
        }

        let exit_price = row.decimal("exit_price", row_number, false)?;
        let entry_time = row.required_datetime("entry_time", row_number)?;
        let exit_time = row
            .get("exit_time")
            .filter(|v| !v.trim().is_empty())
            .and_then(|v| crate::datetime::parse_datetime(v).ok());

        let status = if exit_price.is_some() { Status::Closed } else { Status::Open };

        let commission = row.decimal("commission", row_number, true)?.unwrap_or_default().abs();

        let asset_type = detect_nt_asset_type(symbol_raw);

        let broker_trade_id = row.get("trade_number").map(str::to_string);

        let mut tags = std::collections::BTreeSet::new();
        if let Some(strategy) = row.get("strategy") {
            let strategy = strategy.trim();
            if !strategy.is_empty() {
                tags.insert(strategy.to_lowercase());
            }
        }

        let mut notes_parts = Vec::new();
        if let Some(entry_name) = row.get("entry_name") {
            notes_parts.push(format!("Entry: {entry_name}"));
        }
        if let Some(exit_name) = row.get("exit_name") {
            notes_parts.push(format!("Exit: {exit_name}"));
        }
        let notes = if notes_parts.is_empty() { None } else { Some(notes_parts.join(" | ")) };

        let mut raw_data = row.raw_snapshot();
        if let Some(mae) = row.get("mae") {
            raw_data.insert("mae".to_string(), mae.to_string());
        }
        if let Some(mfe) = row.get("mfe") {
            raw_data.insert("mfe".to_string(), mfe.to_string());
        }

        Ok(Some(Trade {
            id: format!("nt-{row_number}"),
            broker_trade_id,
            symbol,
            asset_type,
            direction,
            status,
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            quantity,
            commission,
            override_pnl: None,
            tags,
            notes,
            account_id: None,
            broker_name: None,
            raw_data: Some(raw_data),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_text;
    use rust_decimal_macros::dec;

    #[test]
    fn futures_contract_suffix_is_stripped() {
        let csv = "Trade #,Instrument,Market pos.,Quantity,Entry price,Exit price,Entry time,Exit time,Profit,Commission\n\
                   1,ES 03-24,Long,1,4850.25,4855.50,01/15/2024 10:30:00,01/15/2024 11:45:00,262.50,4.04\n";
        let result = parse_text(&NinjaTraderParser, csv, None, None);
        assert!(result.success());
        let trade = &result.trades.trades[0];
        assert_eq!(trade.symbol, "ES");
        assert_eq!(trade.asset_type, AssetType::Future);
        assert_eq!(trade.status, Status::Closed);
        assert_eq!(trade.quantity, dec!(1));
    }

    #[test]
    fn strategy_becomes_a_lowercased_tag() {
        let csv = "Instrument,Market pos.,Quantity,Entry price,Exit price,Entry time,Strategy\n\
                   NQ 12-23,Short,2,15000.00,14990.00,01/15/2024 09:00:00,MyStrategy\n";
        let result = parse_text(&NinjaTraderParser, csv, None, None);
        assert!(result.trades.trades[0].tags.contains("mystrategy"));
    }

    #[test]
    fn open_trade_with_no_exit_price() {
        let csv = "Instrument,Market pos.,Quantity,Entry price,Exit price,Entry time\nES 03-24,Long,1,4850.25,,01/15/2024 10:30:00\n";
        let result = parse_text(&NinjaTraderParser, csv, None, None);
        assert_eq!(result.trades.trades[0].status, Status::Open);
    }
}
