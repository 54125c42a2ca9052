//! Tradovate parser: auto-detects between the "Trade Breakdown" format
//! (one row per closed/open trade, P&L back-solves entry price like IB)
//! and the "Order History" format (one row per fill, paired up
//! consecutively per symbol/direction) (spec §4.4 "Tradovate").

use std::cell::Cell;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::RowError;
use crate::model::{AssetType, Broker, Direction, Status, Trade};

use super::interactive_brokers::back_solve_entry_price;
use super::{BrokerParser, ParseResult, RowView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradovateFormat {
    TradeBreakdown,
    OrderHistory,
}

pub struct TradovateParser {
    format: Cell<TradovateFormat>,
}

impl Default for TradovateParser {
    fn default() -> Self {
        Self { format: Cell::new(TradovateFormat::TradeBreakdown) }
    }
}

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("date", "datetime"),
    ("contract", "symbol"),
    ("b/s", "direction"),
    ("buy/sell", "direction"),
    ("qty", "quantity"),
    ("price", "price"),
    ("p&l", "pnl"),
    ("cumulative p&l", "cumulative_pnl"),
    ("commission", "commission"),
    ("orderid", "order_id"),
    ("accountid", "account"),
    ("contractid", "symbol"),
    ("timestamp", "datetime"),
    ("action", "direction"),
    ("ordstatus", "status"),
    ("ordtype", "order_type"),
    ("filledqty", "quantity"),
    ("avgfillprice", "price"),
];

const REQUIRED: &[&str] = &["symbol"];

static FUTURES_CONTRACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Z]{2,4})[FGHJKMNQUVXZ]\d{1,2}$").unwrap());

const FUTURES_SYMBOLS: &[&str] = &[
    "ES", "NQ", "YM", "RTY", "MES", "MNQ", "MYM", "M2K", "CL", "GC", "SI", "NG", "HG", "6E", "6J", "6B", "6A", "6C",
    "ZB", "ZN", "ZF", "ZT",
];

fn normalize_tradovate_symbol(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if let Some(caps) = FUTURES_CONTRACT.captures(&upper) {
        return caps[1].to_string();
    }
    upper
}

/// Tradovate is futures-only in practice; every symbol maps to `Future`
/// whether or not it matches the known-contract list.
fn detect_tradovate_asset_type(symbol: &str) -> AssetType {
    let _ = FUTURES_SYMBOLS.contains(&normalize_tradovate_symbol(symbol).as_str());
    AssetType::Future
}

fn parse_buy_sell(raw: &str) -> Option<Direction> {
    match raw.trim().to_lowercase().as_str() {
        "buy" | "b" | "long" => Some(Direction::Long),
        "sell" | "s" | "short" => Some(Direction::Short),
        _ => None,
    }
}

impl BrokerParser for TradovateParser {
    fn broker(&self) -> Broker {
        Broker::Tradovate
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        COLUMN_MAPPING
    }

    fn normalize_rows(&self, headers: &[String], rows: Vec<csv::StringRecord>) -> Vec<csv::StringRecord> {
        let has_order_history_marker = headers.iter().any(|h| h.eq_ignore_ascii_case("status") || h.eq_ignore_ascii_case("order_id"));
        self.format.set(if has_order_history_marker {
            TradovateFormat::OrderHistory
        } else {
            TradovateFormat::TradeBreakdown
        });
        rows
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        match self.format.get() {
            TradovateFormat::TradeBreakdown => parse_trade_breakdown_row(row, row_number),
            TradovateFormat::OrderHistory => parse_order_history_fill(row, row_number),
        }
    }

    fn postprocess(&self, result: &mut ParseResult) {
        if self.format.get() != TradovateFormat::OrderHistory {
            return;
        }
        let fills = std::mem::take(&mut result.trades.trades);
        result.trades.trades = pair_order_history_fills(fills);
    }
}

fn parse_trade_breakdown_row(row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
    let Some(symbol_raw) = row.get("symbol") else {
        return Ok(None);
    };
    let symbol = normalize_tradovate_symbol(symbol_raw);

    let Some(direction_raw) = row.get("direction") else {
        return Ok(None);
    };
    let Some(direction) = parse_buy_sell(direction_raw) else {
        // a closing leg with no clean buy/sell marker; Tradovate Trade
        // Breakdown exports don't surface these as separate rows.
        return Ok(None);
    };

    let quantity = row.decimal("quantity", row_number, true)?.unwrap_or_default().abs();
    if quantity.is_zero() {
        return Ok(None);
    }

    let price = row.required_decimal("price", row_number, false)?;
    if price.is_zero() || price.is_sign_negative() {
        return Err(RowError::new(row_number, format!("invalid price: {price}")).with_column("price"));
    }

    let trade_time = row.required_datetime("datetime", row_number)?;
    let pnl = row.decimal("pnl", row_number, true)?;
    let commission = row.decimal("commission", row_number, true)?.unwrap_or_default().abs();
    let asset_type = detect_tradovate_asset_type(symbol_raw);

    let trade = match pnl {
        Some(pnl) => {
            let entry_price = back_solve_entry_price(direction, price, pnl, quantity);
            Trade {
                id: format!("tradovate-{row_number}"),
                broker_trade_id: None,
                symbol,
                asset_type,
                direction,
                status: Status::Closed,
                entry_time: trade_time,
                exit_time: Some(trade_time),
                entry_price,
                exit_price: Some(price),
                quantity,
                commission,
                override_pnl: None,
                tags: Default::default(),
                notes: None,
                account_id: None,
                broker_name: None,
                raw_data: Some(row.raw_snapshot()),
            }
        }
        None => Trade {
            id: format!("tradovate-{row_number}"),
            broker_trade_id: None,
            symbol,
            asset_type,
            direction,
            status: Status::Open,
            entry_time: trade_time,
            exit_time: None,
            entry_price: price,
            exit_price: None,
            quantity,
            commission,
            override_pnl: None,
            tags: Default::default(),
            notes: None,
            account_id: None,
            broker_name: None,
            raw_data: Some(row.raw_snapshot()),
        },
    };

    Ok(Some(trade))
}

/// Builds a provisional `Open` trade per Order History row; pairing
/// happens afterward in `pair_order_history_fills`.
fn parse_order_history_fill(row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
    let Some(symbol_raw) = row.get("symbol") else {
        return Ok(None);
    };
    let symbol = normalize_tradovate_symbol(symbol_raw);

    let Some(action_raw) = row.get("direction") else {
        return Ok(None);
    };
    let lowered = action_raw.to_lowercase();
    let direction = if lowered.contains("buy") {
        Direction::Long
    } else if lowered.contains("sell") {
        Direction::Short
    } else {
        return Ok(None);
    };

    let quantity = row.decimal("quantity", row_number, true)?.unwrap_or_default().abs();
    let price = row.decimal("price", row_number, false)?.unwrap_or_default();
    if price.is_zero() || price.is_sign_negative() || quantity.is_zero() {
        return Ok(None);
    }

    let trade_time = row.required_datetime("datetime", row_number)?;
    let commission = row.decimal("commission", row_number, true)?.unwrap_or_default();
    let asset_type = detect_tradovate_asset_type(symbol_raw);

    Ok(Some(Trade {
        id: format!("tradovate-{row_number}"),
        broker_trade_id: None,
        symbol,
        asset_type,
        direction,
        status: Status::Open,
        entry_time: trade_time,
        exit_time: None,
        entry_price: price,
        exit_price: None,
        quantity,
        commission,
        override_pnl: None,
        tags: Default::default(),
        notes: None,
        account_id: None,
        broker_name: None,
        raw_data: Some(row.raw_snapshot()),
    }))
}

/// Groups fills by `(symbol, direction)`, sorts each group by time, and
/// pairs them consecutively: fill 0 is the entry, fill 1 the exit, fill
/// 2 the next entry, and so on. An odd fill left over stays open.
fn pair_order_history_fills(fills: Vec<Trade>) -> Vec<Trade> {
    use std::collections::BTreeMap;

    let mut groups: BTreeMap<(String, bool), Vec<Trade>> = BTreeMap::new();
    for fill in fills {
        let key = (fill.symbol.clone(), fill.direction == Direction::Short);
        groups.entry(key).or_default().push(fill);
    }

    let mut paired = Vec::new();
    for (_, mut group) in groups {
        group.sort_by_key(|t| t.entry_time);
        let mut iter = group.into_iter();
        while let Some(entry) = iter.next() {
            match iter.next() {
                Some(exit_fill) => {
                    let mut trade = entry;
                    trade.status = Status::Closed;
                    trade.exit_time = Some(exit_fill.entry_time);
                    trade.exit_price = Some(exit_fill.entry_price);
                    trade.commission += exit_fill.commission;
                    paired.push(trade);
                }
                None => paired.push(entry),
            }
        }
    }
    paired
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_text;
    use rust_decimal_macros::dec;

    #[test]
    fn scenario_5_tradovate_futures_symbol_normalization() {
        let csv = "Date,Contract,B/S,Qty,Price,P&L,Commission\n\
                   2024-01-15 11:45:00,MNQZ5,Buy,2,17850.25,12.50,2.50\n";
        let result = parse_text(&TradovateParser::default(), csv, None, None);
        assert!(result.success());
        let trade = &result.trades.trades[0];
        assert_eq!(trade.symbol, "MNQ");
        assert_eq!(trade.asset_type, AssetType::Future);
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.status, Status::Closed);
        assert_eq!(trade.entry_price, dec!(17844.00));
    }

    #[test]
    fn order_history_pairs_consecutive_fills() {
        let csv = "Timestamp,ContractId,Action,OrdStatus,FilledQty,AvgFillPrice,Commission\n\
                   2024-01-15 10:30:00,ESH4,Buy,Filled,1,4850.25,2.00\n\
                   2024-01-15 11:45:00,ESH4,Buy,Filled,1,4855.50,2.04\n";
        let result = parse_text(&TradovateParser::default(), csv, None, None);
        assert!(result.success());
        assert_eq!(result.trades.trades.len(), 1);
        let trade = &result.trades.trades[0];
        assert_eq!(trade.status, Status::Closed);
        assert_eq!(trade.entry_price, dec!(4850.25));
        assert_eq!(trade.exit_price, Some(dec!(4855.50)));
        assert_eq!(trade.commission, dec!(4.04));
    }

    #[test]
    fn order_history_leftover_fill_stays_open() {
        let csv = "Timestamp,ContractId,Action,OrdStatus,FilledQty,AvgFillPrice,Commission\n\
                   2024-01-15 10:30:00,ESH4,Buy,Filled,1,4850.25,2.00\n";
        let result = parse_text(&TradovateParser::default(), csv, None, None);
        assert_eq!(result.trades.trades[0].status, Status::Open);
    }
}
