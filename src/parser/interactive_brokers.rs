//! Interactive Brokers parser: Flex-Query and Activity-Statement exports,
//! where buy/sell legs are separate rows and a realized-P&L row implies a
//! closed round-trip (spec §4.4 "Interactive Brokers").

use rust_decimal::Decimal;

use crate::error::RowError;
use crate::model::{AssetType, Broker, Direction, Status, Trade};
use crate::normalize::{direction_from_sign, normalize_symbol, parse_direction_keyword};

use super::{BrokerParser, RowView};

pub struct InteractiveBrokersParser;

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("conid", "contract_id"),
    ("underlyingsymbol", "symbol"),
    ("underlying symbol", "symbol"),
    ("tradeprice", "price"),
    ("t. price", "price"),
    ("tradedate", "date"),
    ("tradetime", "time"),
    ("datetime", "datetime"),
    ("date/time", "datetime"),
    ("buysell", "direction"),
    ("ibcommission", "commission"),
    ("comm/fee", "commission"),
    ("ibtradeid", "broker_trade_id"),
    ("realized p/l", "pnl"),
    ("realizedpnl", "pnl"),
    ("qty", "quantity"),
];

const REQUIRED: &[&str] = &["symbol", "quantity"];

impl BrokerParser for InteractiveBrokersParser {
    fn broker(&self) -> Broker {
        Broker::InteractiveBrokers
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        COLUMN_MAPPING
    }

    fn normalize_rows(&self, headers: &[String], rows: Vec<csv::StringRecord>) -> Vec<csv::StringRecord> {
        // IB exports sometimes embed a duplicate header row as data (when
        // multiple report sections are concatenated). Drop any row whose
        // cells echo the header names.
        rows.into_iter()
            .filter(|row| {
                !row.iter()
                    .zip(headers.iter())
                    .all(|(cell, header)| cell.eq_ignore_ascii_case(header) || cell.trim().is_empty())
            })
            .collect()
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        let Some(symbol_raw) = row.get("symbol") else {
            return Ok(None);
        };
        let symbol = normalize_symbol(symbol_raw.split_whitespace().next().unwrap_or(symbol_raw));

        let quantity_raw = row.required_decimal("quantity", row_number, true)?;
        if quantity_raw.is_zero() {
            return Ok(None);
        }

        let direction = match row.get("direction") {
            Some(d) if !d.trim().is_empty() => parse_direction_keyword(d)
                .ok_or_else(|| RowError::new(row_number, format!("unknown direction: {d}")).with_column("direction"))?,
            _ => direction_from_sign(quantity_raw),
        };
        let quantity = quantity_raw.abs();

        let price = row.required_decimal("price", row_number, false)?;
        if price.is_zero() || price.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid price: {price}")).with_column("price"));
        }

        let trade_time = resolve_ib_datetime(row, row_number)?;
        let commission = row.decimal("commission", row_number, true)?.unwrap_or_default().abs();
        let pnl = row.decimal("pnl", row_number, true)?;
        let asset_type = row
            .get_any(&["assetclass", "asset_class"])
            .map(map_asset_class)
            .unwrap_or(AssetType::Stock);
        let broker_trade_id = row.get("broker_trade_id").map(str::to_string);

        let trade = match pnl {
            Some(pnl) if !pnl.is_zero() => {
                let entry_price = back_solve_entry_price(direction, price, pnl, quantity);
                Trade {
                    id: format!("ib-{row_number}"),
                    broker_trade_id,
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
            _ => Trade {
                id: format!("ib-{row_number}"),
                broker_trade_id,
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
}

/// `entry = exit - pnl/qty` for longs, `entry = exit + pnl/qty` for
/// shorts — the realized-P&L back-solve used by IB and Tradovate Trade
/// Breakdown rows alike.
pub(crate) fn back_solve_entry_price(direction: Direction, exit_price: Decimal, pnl: Decimal, quantity: Decimal) -> Decimal {
    let per_unit = pnl / quantity;
    match direction {
        Direction::Long => exit_price - per_unit,
        Direction::Short => exit_price + per_unit,
    }
}

fn map_asset_class(code: &str) -> AssetType {
    match code.to_uppercase().as_str() {
        "STK" => AssetType::Stock,
        "OPT" => AssetType::Option,
        "FUT" => AssetType::Future,
        "CASH" | "FX" => AssetType::Forex,
        "CRYPTO" => AssetType::Crypto,
        "CFD" => AssetType::Cfd,
        _ => AssetType::Stock,
    }
}

fn resolve_ib_datetime(row: &RowView, row_number: usize) -> Result<chrono::NaiveDateTime, RowError> {
    if row.get("datetime").is_some() {
        return row.required_datetime("datetime", row_number);
    }
    if let (Some(date), Some(time)) = (row.get("date"), row.get("time")) {
        let combined = format!("{date} {time}");
        return crate::datetime::parse_datetime(&combined)
            .map_err(|e| RowError::new(row_number, e.to_string()).with_column("datetime").with_raw_value(combined));
    }
    Err(RowError::new(row_number, "could not find date/time in row"))
}
