//! Generic CSV parser: straight mapping of canonical columns, no
//! broker-specific row semantics (spec §4.4 "Generic").

use crate::error::RowError;
use crate::model::{AssetType, Broker, Status, Trade};
use crate::normalize::{normalize_symbol, parse_direction_keyword};

use super::{BrokerParser, RowView};

pub struct GenericParser;

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("ticker", "symbol"),
    ("instrument", "symbol"),
    ("asset", "symbol"),
    ("pair", "symbol"),
    ("side", "direction"),
    ("type", "direction"),
    ("action", "direction"),
    ("position", "direction"),
    ("open_time", "entry_time"),
    ("entry_date", "entry_time"),
    ("open_date", "entry_time"),
    ("close_time", "exit_time"),
    ("exit_date", "exit_time"),
    ("close_date", "exit_time"),
    ("open_price", "entry_price"),
    ("close_price", "exit_price"),
    ("buy_price", "entry_price"),
    ("sell_price", "exit_price"),
    ("size", "quantity"),
    ("volume", "quantity"),
    ("lots", "quantity"),
    ("amount", "quantity"),
    ("shares", "quantity"),
    ("contracts", "quantity"),
    ("fee", "commission"),
    ("fees", "commission"),
    ("cost", "commission"),
];

const REQUIRED: &[&str] = &["symbol", "direction", "entry_time", "entry_price", "quantity"];

impl BrokerParser for GenericParser {
    fn broker(&self) -> Broker {
        Broker::Generic
    }

    fn required_columns(&self) -> &[&str] {
        REQUIRED
    }

    fn column_mapping(&self) -> &[(&str, &str)] {
        COLUMN_MAPPING
    }

    fn parse_row(&self, row: &RowView, row_number: usize) -> Result<Option<Trade>, RowError> {
        let symbol = normalize_symbol(row.required_str("symbol", row_number)?);
        if symbol.is_empty() {
            return Err(RowError::new(row_number, "symbol is required").with_column("symbol"));
        }

        let direction_raw = row.required_str("direction", row_number)?;
        let direction = parse_direction_keyword(direction_raw)
            .ok_or_else(|| RowError::new(row_number, format!("unknown direction: {direction_raw}")).with_column("direction"))?;

        let entry_time = row.required_datetime("entry_time", row_number)?;
        let entry_price = row.required_decimal("entry_price", row_number, false)?;
        let quantity = row.required_decimal("quantity", row_number, false)?;

        if quantity.is_zero() || quantity.is_sign_negative() {
            return Err(RowError::new(row_number, "quantity must be positive").with_column("quantity"));
        }
        if entry_price.is_zero() || entry_price.is_sign_negative() {
            return Err(RowError::new(row_number, "entry price must be positive").with_column("entry_price"));
        }

        let exit_time = row.datetime("exit_time", row_number)?;
        let exit_price = row.decimal("exit_price", row_number, false)?;

        let (status, exit_time, exit_price) = match (exit_time, exit_price) {
            (Some(et), Some(ep)) => {
                if et < entry_time {
                    return Err(RowError::new(row_number, "exit time cannot be before entry time").with_column("exit_time"));
                }
                (Status::Closed, Some(et), Some(ep))
            }
            _ => (Status::Open, None, None),
        };

        let commission = row.decimal("commission", row_number, true)?.unwrap_or_default();

        let asset_type = row
            .get("asset_type")
            .and_then(|s| s.to_lowercase().parse::<AssetType>().ok())
            .unwrap_or(AssetType::Stock);

        let tags = row
            .get("tags")
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let notes = row.get("notes").map(str::to_string);

        Ok(Some(Trade {
            id: format!("generic-{row_number}"),
            broker_trade_id: None,
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
            raw_data: Some(row.raw_snapshot()),
        }))
    }
}
