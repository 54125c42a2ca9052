//! Canonical data model: `Trade`, `TradeCollection`, and the enumerated
//! fields that classify a trade (`Direction`, `Status`, `AssetType`,
//! `Broker`).

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Long or short side of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// Lifecycle state of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Open,
    Closed,
    Partial,
}

/// Instrument class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Option,
    Future,
    Forex,
    Crypto,
    Cfd,
    Other,
}

/// Stable broker identifier tokens (see spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
pub enum Broker {
    #[strum(serialize = "generic")]
    Generic,
    #[strum(serialize = "interactive_brokers")]
    InteractiveBrokers,
    #[strum(serialize = "metatrader4")]
    MetaTrader4,
    #[strum(serialize = "metatrader5")]
    MetaTrader5,
    #[strum(serialize = "binance")]
    Binance,
    #[strum(serialize = "ninja_trader")]
    NinjaTrader,
    #[strum(serialize = "tradovate")]
    Tradovate,
    // Reserved future tokens: no parser implements these yet.
    #[strum(serialize = "coinbase")]
    Coinbase,
    #[strum(serialize = "topstepx")]
    TopstepX,
    #[strum(serialize = "thinkorswim")]
    ThinkOrSwim,
    #[strum(serialize = "webull")]
    Webull,
    #[strum(serialize = "robinhood")]
    Robinhood,
    #[strum(serialize = "etrade")]
    Etrade,
    #[strum(serialize = "tradestation")]
    TradeStation,
}

impl Broker {
    /// All broker tokens, implemented and reserved alike, for catalogue
    /// display purposes (e.g., a frontend broker picker).
    pub fn all() -> &'static [Broker] {
        &[
            Broker::Generic,
            Broker::InteractiveBrokers,
            Broker::MetaTrader4,
            Broker::MetaTrader5,
            Broker::Binance,
            Broker::NinjaTrader,
            Broker::Tradovate,
            Broker::Coinbase,
            Broker::TopstepX,
            Broker::ThinkOrSwim,
            Broker::Webull,
            Broker::Robinhood,
            Broker::Etrade,
            Broker::TradeStation,
        ]
    }

    /// A short human-readable description, for a broker picker UI.
    pub fn description(&self) -> &'static str {
        match self {
            Broker::Generic => "Generic CSV export",
            Broker::InteractiveBrokers => "Interactive Brokers",
            Broker::MetaTrader4 => "MetaTrader 4",
            Broker::MetaTrader5 => "MetaTrader 5",
            Broker::Binance => "Binance",
            Broker::NinjaTrader => "NinjaTrader 8",
            Broker::Tradovate => "Tradovate",
            Broker::Coinbase => "Coinbase (reserved, not yet implemented)",
            Broker::TopstepX => "TopstepX (reserved, not yet implemented)",
            Broker::ThinkOrSwim => "thinkorswim (reserved, not yet implemented)",
            Broker::Webull => "Webull (reserved, not yet implemented)",
            Broker::Robinhood => "Robinhood (reserved, not yet implemented)",
            Broker::Etrade => "E*TRADE (reserved, not yet implemented)",
            Broker::TradeStation => "TradeStation (reserved, not yet implemented)",
        }
    }
}

/// A single, possibly-paired position.
///
/// Derived fields (`pnl_gross`, `pnl_net`, `pnl_percent`,
/// `duration_minutes`, `is_winner`) are methods, not stored columns, so
/// they can never drift out of sync with the stored fields they derive
/// from (see design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub broker_trade_id: Option<String>,
    pub symbol: String,
    pub asset_type: AssetType,
    pub direction: Direction,
    pub status: Status,
    pub entry_time: NaiveDateTime,
    pub exit_time: Option<NaiveDateTime>,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub commission: Decimal,
    pub override_pnl: Option<Decimal>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub notes: Option<String>,
    pub account_id: Option<String>,
    pub broker_name: Option<Broker>,
    pub raw_data: Option<std::collections::BTreeMap<String, String>>,
}

impl Trade {
    /// Gross P&L: `override_pnl` if set, else the closed-trade formula,
    /// else `None` (an open trade has no realized gross P&L).
    pub fn pnl_gross(&self) -> Option<Decimal> {
        if let Some(o) = self.override_pnl {
            return Some(o);
        }
        if self.status == Status::Open {
            return None;
        }
        let exit = self.exit_price?;
        Some(match self.direction {
            Direction::Long => (exit - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - exit) * self.quantity,
        })
    }

    /// Net P&L after commission.
    pub fn pnl_net(&self) -> Option<Decimal> {
        self.pnl_gross().map(|g| g - self.commission)
    }

    /// Gross P&L as a percentage of capital committed at entry. Zero
    /// when the denominator is zero.
    pub fn pnl_percent(&self) -> Option<Decimal> {
        let gross = self.pnl_gross()?;
        let denom = self.entry_price * self.quantity;
        if denom.is_zero() {
            return Some(Decimal::ZERO);
        }
        Some(gross / denom * Decimal::ONE_HUNDRED)
    }

    /// Whole minutes held, for closed trades.
    pub fn duration_minutes(&self) -> Option<i64> {
        let exit = self.exit_time?;
        Some((exit - self.entry_time).num_seconds().div_euclid(60))
    }

    /// `true` iff net P&L is defined and strictly positive.
    pub fn is_winner(&self) -> Option<bool> {
        self.pnl_net().map(|n| n > Decimal::ZERO)
    }

    /// Always `None`: reserved for a future stop-loss/planned-risk model
    /// (see GLOSSARY — "R-multiple... not computed here").
    pub fn r_multiple(&self) -> Option<Decimal> {
        None
    }

    /// Entry/exit marker pair for a charting frontend, or `None` if the
    /// trade has no exit leg yet.
    pub fn to_chart_point(&self) -> Option<ChartPoint> {
        Some(ChartPoint {
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time: self.exit_time?,
            exit_price: self.exit_price?,
            direction: self.direction,
        })
    }
}

/// Entry/exit marker pair consumed by a charting frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub entry_time: NaiveDateTime,
    pub entry_price: Decimal,
    pub exit_time: NaiveDateTime,
    pub exit_price: Decimal,
    pub direction: Direction,
}

/// An ordered, insertion-extensible sequence of trades plus source
/// metadata. Created by a parser, mutated only during parsing and
/// post-parse aggregation, consumed read-only by the statistics engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeCollection {
    pub trades: Vec<Trade>,
    pub source_file: Option<String>,
    pub broker_name: Option<Broker>,
    pub imported_at: Option<NaiveDateTime>,
}

impl TradeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn total_pnl(&self) -> Decimal {
        self.trades.iter().filter_map(|t| t.pnl_net()).sum()
    }

    pub fn win_rate(&self) -> Option<Decimal> {
        let (winners, losers) = self.trades.iter().filter_map(|t| t.is_winner()).fold(
            (0u32, 0u32),
            |(w, l), is_winner| if is_winner { (w + 1, l) } else { (w, l + 1) },
        );
        let total = winners + losers;
        if total == 0 {
            return None;
        }
        Some(Decimal::from(winners) / Decimal::from(total) * Decimal::ONE_HUNDRED)
    }

    pub fn filter_by_symbol(&self, symbol: &str) -> TradeCollection {
        let mut out = self.clone();
        out.trades.retain(|t| t.symbol.eq_ignore_ascii_case(symbol));
        out
    }

    pub fn filter_by_date_range(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> TradeCollection {
        let mut out = self.clone();
        out.trades.retain(|t| {
            start.is_none_or(|s| t.entry_time >= s) && end.is_none_or(|e| t.entry_time <= e)
        });
        out
    }

    pub fn filter_by_tag(&self, tag: &str) -> TradeCollection {
        let tag = tag.to_lowercase();
        let mut out = self.clone();
        out.trades.retain(|t| t.tags.contains(&tag));
        out
    }
}
