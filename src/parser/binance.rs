//! Binance parser: spot and futures trade-history exports where every row
//! is a single fill, optionally followed by an aggregation pass (spec
//! §4.4 "Binance", §4.6 "Fill aggregator").

use regex::Regex;
use std::sync::LazyLock;

use crate::config::AggregationConfig;
use crate::error::RowError;
use crate::model::{AssetType, Broker, Status, Trade};
use crate::normalize::parse_direction_keyword;

use super::{BrokerParser, ParseResult, RowView};

pub struct BinanceParser {
    pub aggregate_fills: bool,
    pub aggregation: AggregationConfig,
}

impl Default for BinanceParser {
    fn default() -> Self {
        Self {
            aggregate_fills: true,
            aggregation: AggregationConfig::default(),
        }
    }
}

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("date(utc)", "datetime"),
    ("date", "datetime"),
    ("pair", "symbol"),
    ("side", "direction"),
    ("executed", "quantity"),
    ("amount", "value"),
    ("fee", "commission"),
    ("symbol", "symbol"),
    ("quantity", "quantity"),
    ("quote quantity", "value"),
    ("commission", "commission"),
    ("commission asset", "commission_asset"),
    ("realized profit", "pnl"),
];

const REQUIRED: &[&str] = &["symbol", "direction", "price", "quantity"];

const QUOTE_CURRENCIES: &[&str] = &["USDT", "BUSD", "BTC", "ETH", "BNB", "USD", "USDC"];

static NON_NUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.\-]").unwrap());

fn normalize_binance_symbol(raw: &str) -> String {
    let symbol = raw.trim().to_uppercase();
    if symbol.contains('/') {
        return symbol;
    }
    for quote in QUOTE_CURRENCIES {
        if let Some(base) = symbol.strip_suffix(quote)
            && base.len() >= 2 {
                return format!("{base}/{quote}");
            }
    }
    symbol
}

impl BrokerParser for BinanceParser {
    fn broker(&self) -> Broker {
        Broker::Binance
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        COLUMN_MAPPING
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        let symbol_raw = row.required_str("symbol", row_number)?;
        let symbol = normalize_binance_symbol(symbol_raw);
        if symbol.is_empty() || symbol == "/" {
            return Err(RowError::new(row_number, "symbol is required").with_column("symbol"));
        }

        let direction_raw = row.required_str("direction", row_number)?;
        let direction = parse_direction_keyword(direction_raw)
            .ok_or_else(|| RowError::new(row_number, format!("unknown direction: {direction_raw}")).with_column("direction"))?;

        let trade_time = row.required_datetime("datetime", row_number)?;

        let price = row.required_decimal("price", row_number, false)?;
        if price.is_zero() || price.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid price: {price}")).with_column("price"));
        }

        let quantity = row.required_decimal("quantity", row_number, false)?;
        if quantity.is_zero() || quantity.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid quantity: {quantity}")).with_column("quantity"));
        }

        let commission = row
            .get("commission")
            .map(|raw| {
                let stripped = NON_NUMERIC.replace_all(raw, "").to_string();
                crate::decimal::parse_decimal(&stripped, true).map(|d| d.abs()).unwrap_or_default()
            })
            .unwrap_or_default();

        let pnl = row.decimal("pnl", row_number, true)?;

        let trade = match pnl {
            Some(pnl) => {
                let entry_price = super::interactive_brokers::back_solve_entry_price(direction, price, pnl, quantity);
                Trade {
                    id: format!("binance-{row_number}"),
                    broker_trade_id: None,
                    symbol,
                    asset_type: AssetType::Crypto,
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
                id: format!("binance-{row_number}"),
                broker_trade_id: None,
                symbol,
                asset_type: AssetType::Crypto,
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

    fn postprocess(&self, result: &mut ParseResult) {
        if !self.aggregate_fills || result.trades.trades.is_empty() {
            return;
        }
        let fills = std::mem::take(&mut result.trades.trades);
        let (merged, consumed) = super::fill_aggregator::aggregate_fills(fills, self.aggregation.bucket);
        let merged_count = merged.len();
        result.trades.trades = merged;
        result.add_warning(format!("aggregated {consumed} fills into {merged_count} trades"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_text;
    use rust_decimal_macros::dec;

    #[test]
    fn scenario_3_binance_aggregation() {
        let csv = "Date(UTC),Pair,Side,Price,Executed\n\
                   2024-01-01 10:00:15,BTCUSDT,BUY,40000,0.1\n\
                   2024-01-01 10:00:42,BTCUSDT,BUY,40010,0.2\n\
                   2024-01-01 10:00:51,BTCUSDT,BUY,40020,0.3\n\
                   2024-01-01 10:00:59,BTCUSDT,BUY,40030,0.4\n";
        let result = parse_text(&BinanceParser::default(), csv, None, None);
        assert!(result.success());
        assert_eq!(result.trades.trades.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0], "aggregated 4 fills into 1 trades");
        let trade = &result.trades.trades[0];
        assert_eq!(trade.quantity, dec!(1.0));
        assert_eq!(trade.entry_price, dec!(40020));
        assert_eq!(trade.symbol, "BTC/USDT");
    }

    #[test]
    fn fee_with_currency_sigil_is_stripped() {
        let csv = "Date(UTC),Pair,Side,Price,Executed,Fee\n2024-01-01 10:00:00,BTCUSDT,BUY,40000,0.1,-0.04 USDT\n";
        let result = parse_text(&BinanceParser { aggregate_fills: false, ..Default::default() }, csv, None, None);
        assert_eq!(result.trades.trades[0].commission, dec!(0.04));
    }
}
