//! MetaTrader 4/5 parser. MT5 is the same component with a couple of
//! extra column aliases, parameterized by a broker tag instead of a
//! subclass (spec §9 "MT5-inherits-from-MT4 -> shared implementation
//! with config record").

use rust_decimal::Decimal;

use crate::error::RowError;
use crate::model::{AssetType, Broker, Direction, Status, Trade};
use crate::normalize::normalize_symbol;

use super::{BrokerParser, RowView};

pub struct MetaTraderParser {
    pub broker: Broker,
}

impl MetaTraderParser {
    pub fn mt4() -> Self {
        Self { broker: Broker::MetaTrader4 }
    }

    pub fn mt5() -> Self {
        Self { broker: Broker::MetaTrader5 }
    }
}

const MT4_MAPPING: &[(&str, &str)] = &[
    ("ticket", "ticket"),
    ("open time", "entry_time"),
    ("type", "direction"),
    ("size", "quantity"),
    ("price", "entry_price"),
    ("s/l", "stop_loss"),
    ("t/p", "take_profit"),
    ("close time", "exit_time"),
    ("close price", "exit_price"),
    ("commission", "commission"),
    ("swap", "swap"),
    ("profit", "pnl"),
    ("position", "ticket"),
    ("volume", "quantity"),
    ("time", "entry_time"),
    ("time.1", "exit_time"),
    ("price.1", "exit_price"),
];

const MT5_MAPPING: &[(&str, &str)] = &[
    ("ticket", "ticket"),
    ("open time", "entry_time"),
    ("type", "direction"),
    ("size", "quantity"),
    ("price", "entry_price"),
    ("s/l", "stop_loss"),
    ("t/p", "take_profit"),
    ("close time", "exit_time"),
    ("close price", "exit_price"),
    ("commission", "commission"),
    ("swap", "swap"),
    ("profit", "pnl"),
    ("position", "ticket"),
    ("volume", "quantity"),
    ("time", "entry_time"),
    ("time.1", "exit_time"),
    ("price.1", "exit_price"),
    ("deal", "ticket"),
];

const REQUIRED: &[&str] = &["ticket", "symbol", "direction", "quantity"];

const PENDING_ROW_MARKERS: &[&str] = &[
    "buy limit",
    "sell limit",
    "buy stop",
    "sell stop",
    "balance",
    "credit",
    "deposit",
    "withdraw",
];

const FOREX_SYMBOLS: &[&str] = &[
    "EURUSD", "GBPUSD", "USDJPY", "USDCHF", "AUDUSD", "USDCAD", "NZDUSD", "EURGBP", "EURJPY", "GBPJPY",
];

const CRYPTO_PREFIXES: &[&str] = &["BTC", "ETH", "XRP", "LTC", "BCH", "ADA", "DOT", "LINK"];

const INDEX_SYMBOLS: &[&str] = &["US30", "US500", "NAS100", "GER30", "UK100", "JPN225", "SPX500"];

const COMMODITY_SYMBOLS: &[&str] = &["XAUUSD", "XAGUSD", "GOLD", "SILVER", "OIL", "USOIL", "UKOIL"];

impl BrokerParser for MetaTraderParser {
    fn broker(&self) -> Broker {
        self.broker
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        match self.broker {
            Broker::MetaTrader5 => MT5_MAPPING,
            _ => MT4_MAPPING,
        }
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        let direction_raw = row.required_str("direction", row_number)?;
        if is_pending_or_bookkeeping_row(direction_raw) {
            return Ok(None);
        }
        let direction = parse_mt_direction(direction_raw)
            .ok_or_else(|| RowError::new(row_number, format!("unknown order type: {direction_raw}")).with_column("direction"))?;

        let symbol = normalize_symbol(row.required_str("symbol", row_number)?);
        let broker_trade_id = row.get("ticket").map(str::to_string);

        let quantity = row.required_decimal("quantity", row_number, false)?;
        if quantity.is_zero() || quantity.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid quantity: {quantity}")).with_column("quantity"));
        }

        let entry_time = row.required_datetime("entry_time", row_number)?;
        let entry_price = row.required_decimal("entry_price", row_number, false)?;
        if entry_price.is_zero() || entry_price.is_sign_negative() {
            return Err(RowError::new(row_number, format!("invalid entry price: {entry_price}")).with_column("entry_price"));
        }

        let (status, exit_time, exit_price) = resolve_exit_leg(row);

        let commission = row.decimal("commission", row_number, true)?.unwrap_or_default().abs();
        let swap = row.decimal("swap", row_number, true)?.unwrap_or_default();
        let total_commission = commission + swap.abs();

        let asset_type = detect_asset_type(&symbol);

        Ok(Some(Trade {
            id: format!("mt-{row_number}"),
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
            commission: total_commission,
            override_pnl: None,
            tags: Default::default(),
            notes: None,
            account_id: None,
            broker_name: None,
            raw_data: Some(row.raw_snapshot()),
        }))
    }
}

fn is_pending_or_bookkeeping_row(direction_raw: &str) -> bool {
    let lowered = direction_raw.to_lowercase();
    PENDING_ROW_MARKERS.iter().any(|m| lowered.contains(m))
}

fn parse_mt_direction(value: &str) -> Option<Direction> {
    let lowered = value.trim().to_lowercase();
    if lowered.contains("buy") || lowered == "0" {
        Some(Direction::Long)
    } else if lowered.contains("sell") || lowered == "1" {
        Some(Direction::Short)
    } else {
        None
    }
}

fn resolve_exit_leg(row: &RowView) -> (Status, Option<chrono::NaiveDateTime>, Option<Decimal>) {
    let exit_time = row.get("exit_time").and_then(|v| crate::datetime::parse_datetime(v).ok());
    let exit_price = row
        .get("exit_price")
        .and_then(|v| crate::decimal::parse_decimal(v, false).ok());

    match (exit_time, exit_price) {
        (Some(et), Some(ep)) if !ep.is_zero() && ep.is_sign_positive() => (Status::Closed, Some(et), Some(ep)),
        _ => (Status::Open, None, None),
    }
}

fn detect_asset_type(symbol: &str) -> AssetType {
    let upper = symbol.to_uppercase();
    if (upper.len() == 6 && upper.chars().all(|c| c.is_ascii_alphabetic())) || FOREX_SYMBOLS.contains(&upper.as_str()) {
        return AssetType::Forex;
    }
    if CRYPTO_PREFIXES.iter().any(|p| upper.starts_with(p)) {
        return AssetType::Crypto;
    }
    if INDEX_SYMBOLS.iter().any(|i| upper.contains(i)) {
        return AssetType::Cfd;
    }
    if COMMODITY_SYMBOLS.iter().any(|c| upper.contains(c)) {
        return AssetType::Cfd;
    }
    AssetType::Cfd
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_text;
    use rust_decimal_macros::dec;

    #[test]
    fn scenario_2_mt4_forex() {
        let csv = "Ticket,Open Time,Type,Size,Symbol,Price,S/L,T/P,Close Time,Close Price,Commission,Swap,Profit\n\
                   101,2024.03.04 09:30:00,buy,0.10,EURUSD,1.08500,,,2024.03.04 10:15:00,1.08700,0.00,0.00,2.00\n";
        let result = parse_text(&MetaTraderParser::mt4(), csv, None, None);
        assert!(result.success());
        let trade = &result.trades.trades[0];
        assert_eq!(trade.status, Status::Closed);
        assert_eq!(trade.quantity, dec!(0.10));
        assert_eq!(trade.asset_type, AssetType::Forex);
        assert_eq!(trade.duration_minutes(), Some(45));
        let gross = trade.pnl_gross().unwrap();
        assert_eq!(gross, dec!(0.00200) * dec!(0.10));
    }

    #[test]
    fn pending_orders_are_filtered() {
        let csv = "Ticket,Open Time,Type,Size,Symbol,Price,S/L,T/P,Close Time,Close Price,Commission,Swap,Profit\n\
                   102,2024.03.04 09:30:00,buy limit,0.10,EURUSD,1.08500,,,,,0.00,0.00,0.00\n";
        let result = parse_text(&MetaTraderParser::mt4(), csv, None, None);
        assert_eq!(result.skipped_rows, 1);
        assert_eq!(result.parsed_successfully, 0);
    }

    #[test]
    fn commission_aggregates_swap() {
        let csv = "Ticket,Open Time,Type,Size,Symbol,Price,S/L,T/P,Close Time,Close Price,Commission,Swap,Profit\n\
                   103,2024.03.04 09:30:00,buy,0.10,EURUSD,1.08500,,,2024.03.04 10:15:00,1.08700,1.00,-0.50,2.00\n";
        let result = parse_text(&MetaTraderParser::mt4(), csv, None, None);
        assert_eq!(result.trades.trades[0].commission, dec!(1.50));
    }
}
