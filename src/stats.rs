//! Aggregate trading statistics over a `TradeCollection` (spec §4.7),
//! grounded on the original system's `TradeService.get_statistics` and
//! its `_calculate_*` helpers.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{Status, Trade, TradeCollection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPnl {
    pub date: NaiveDate,
    pub pnl: Decimal,
    pub trades_count: usize,
    pub winners: usize,
    pub losers: usize,
    pub cumulative_pnl: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyStats {
    pub hour: u32,
    pub trades: usize,
    pub wins: usize,
    pub pnl: Decimal,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolStats {
    pub trades: usize,
    pub winners: usize,
    pub losers: usize,
    pub pnl: Decimal,
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub open_trades: usize,
    pub total_pnl: Decimal,
    pub total_commission: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub avg_winner: Option<Decimal>,
    pub avg_loser: Option<Decimal>,
    pub largest_winner: Option<Decimal>,
    pub largest_loser: Option<Decimal>,
    pub best_trading_hour: Option<u32>,
    pub worst_trading_hour: Option<u32>,
    pub by_symbol: BTreeMap<String, SymbolStats>,
    pub daily_pnl: Vec<DailyPnl>,
    pub hourly_stats: Vec<HourlyStats>,
    pub current_streak: i64,
    pub best_streak: i64,
    pub worst_streak: i64,
}

/// A trade counts as a winner/loser only when `pnl_net` is defined and
/// strictly non-zero; a trade that nets out to exactly zero is neither
/// (mirrors the source system's falsy-zero-Decimal check).
fn is_winner(trade: &Trade) -> Option<bool> {
    trade.pnl_net().and_then(|n| if n.is_zero() { None } else { Some(n > Decimal::ZERO) })
}

pub fn compute_stats(collection: &TradeCollection) -> TradeStats {
    let trades = &collection.trades;

    if trades.is_empty() {
        return TradeStats {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            open_trades: 0,
            total_pnl: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            win_rate: None,
            profit_factor: None,
            avg_winner: None,
            avg_loser: None,
            largest_winner: None,
            largest_loser: None,
            best_trading_hour: None,
            worst_trading_hour: None,
            by_symbol: BTreeMap::new(),
            daily_pnl: Vec::new(),
            hourly_stats: Vec::new(),
            current_streak: 0,
            best_streak: 0,
            worst_streak: 0,
        };
    }

    let closed: Vec<&Trade> = trades.iter().filter(|t| t.status == Status::Closed).collect();
    let open_count = trades.iter().filter(|t| t.status == Status::Open).count();

    let winners: Vec<&&Trade> = closed.iter().filter(|t| is_winner(t) == Some(true)).collect();
    let losers: Vec<&&Trade> = closed.iter().filter(|t| is_winner(t) == Some(false)).collect();

    let total_pnl: Decimal = closed.iter().filter_map(|t| t.pnl_net()).sum();
    let total_commission: Decimal = trades.iter().map(|t| t.commission).sum();

    let gross_profit: Decimal = winners.iter().filter_map(|t| t.pnl_net()).sum();
    let gross_loss: Decimal = losers.iter().filter_map(|t| t.pnl_net()).sum::<Decimal>().abs();

    let win_rate = if closed.is_empty() {
        None
    } else {
        Some((winners.len() as f64 / closed.len() as f64) * 100.0)
    };

    let profit_factor = if gross_loss > Decimal::ZERO {
        (gross_profit / gross_loss).to_f64()
    } else {
        None
    };

    let avg_winner = if winners.is_empty() {
        None
    } else {
        Some(gross_profit / Decimal::from(winners.len()))
    };
    let avg_loser = if losers.is_empty() {
        None
    } else {
        Some(gross_loss / Decimal::from(losers.len()))
    };

    let largest_winner = winners.iter().filter_map(|t| t.pnl_net()).max();
    let largest_loser = losers.iter().filter_map(|t| t.pnl_net()).min().map(|d| d.abs());

    let daily_pnl = calculate_daily_pnl(&closed);
    let hourly_stats = calculate_hourly_stats(&closed);

    let best_trading_hour = hourly_stats
        .iter()
        .filter(|h| h.pnl > Decimal::ZERO)
        .max_by_key(|h| h.pnl)
        .map(|h| h.hour);
    let worst_trading_hour = hourly_stats
        .iter()
        .filter(|h| h.pnl < Decimal::ZERO)
        .min_by_key(|h| h.pnl)
        .map(|h| h.hour);

    let by_symbol = calculate_by_symbol(&closed);
    let (current_streak, best_streak, worst_streak) = calculate_streaks(&closed);

    TradeStats {
        total_trades: trades.len(),
        winning_trades: winners.len(),
        losing_trades: losers.len(),
        open_trades: open_count,
        total_pnl,
        total_commission,
        gross_profit,
        gross_loss,
        win_rate,
        profit_factor,
        avg_winner,
        avg_loser,
        largest_winner,
        largest_loser,
        best_trading_hour,
        worst_trading_hour,
        by_symbol,
        daily_pnl,
        hourly_stats,
        current_streak,
        best_streak,
        worst_streak,
    }
}

fn calculate_daily_pnl(closed: &[&Trade]) -> Vec<DailyPnl> {
    let mut sorted: Vec<&&Trade> = closed.iter().filter(|t| t.exit_time.is_some()).collect();
    sorted.sort_by_key(|t| t.exit_time.unwrap());

    let mut by_date: BTreeMap<NaiveDate, (Decimal, usize, usize, usize)> = BTreeMap::new();
    for trade in sorted {
        let Some(net) = trade.pnl_net() else { continue };
        if net.is_zero() {
            continue;
        }
        let date = trade.exit_time.unwrap().date();
        let entry = by_date.entry(date).or_insert((Decimal::ZERO, 0, 0, 0));
        entry.0 += net;
        entry.1 += 1;
        if net > Decimal::ZERO {
            entry.2 += 1;
        } else {
            entry.3 += 1;
        }
    }

    let mut cumulative = Decimal::ZERO;
    by_date
        .into_iter()
        .map(|(date, (pnl, trades_count, winners, losers))| {
            cumulative += pnl;
            DailyPnl { date, pnl, trades_count, winners, losers, cumulative_pnl: cumulative }
        })
        .collect()
}

fn calculate_hourly_stats(closed: &[&Trade]) -> Vec<HourlyStats> {
    let mut by_hour: BTreeMap<u32, (usize, usize, Decimal)> = BTreeMap::new();
    for trade in closed {
        let Some(net) = trade.pnl_net() else { continue };
        if net.is_zero() {
            continue;
        }
        let hour = trade.entry_time.hour();
        let entry = by_hour.entry(hour).or_insert((0, 0, Decimal::ZERO));
        entry.0 += 1;
        entry.2 += net;
        if net > Decimal::ZERO {
            entry.1 += 1;
        }
    }

    by_hour
        .into_iter()
        .map(|(hour, (trades, wins, pnl))| {
            let win_rate = if trades > 0 { Some((wins as f64 / trades as f64) * 100.0) } else { None };
            HourlyStats { hour, trades, wins, pnl, win_rate }
        })
        .collect()
}

fn calculate_by_symbol(closed: &[&Trade]) -> BTreeMap<String, SymbolStats> {
    let mut by_symbol: BTreeMap<String, (usize, usize, usize, Decimal)> = BTreeMap::new();
    for trade in closed {
        let entry = by_symbol.entry(trade.symbol.clone()).or_insert((0, 0, 0, Decimal::ZERO));
        entry.0 += 1;
        if let Some(net) = trade.pnl_net()
            && !net.is_zero() {
                entry.3 += net;
                if net > Decimal::ZERO {
                    entry.1 += 1;
                } else {
                    entry.2 += 1;
                }
            }
    }

    by_symbol
        .into_iter()
        .map(|(symbol, (trades, winners, losers, pnl))| {
            let total = winners + losers;
            let win_rate = if total > 0 { Some((winners as f64 / total as f64) * 100.0) } else { None };
            (symbol, SymbolStats { trades, winners, losers, pnl, win_rate })
        })
        .collect()
}

/// Returns `(current_streak, best_streak, worst_streak)`; `worst_streak`
/// is reported as its absolute value (spec §4.7).
fn calculate_streaks(closed: &[&Trade]) -> (i64, i64, i64) {
    if closed.is_empty() {
        return (0, 0, 0);
    }

    let mut sorted: Vec<&&Trade> = closed.iter().collect();
    sorted.sort_by_key(|t| t.exit_time.unwrap_or(t.entry_time));

    let mut current = 0i64;
    let mut best = 0i64;
    let mut worst = 0i64;
    let mut temp = 0i64;

    for trade in sorted {
        let Some(winner) = is_winner(trade) else { continue };
        if winner {
            temp = if temp > 0 { temp + 1 } else { 1 };
            best = best.max(temp);
        } else {
            temp = if temp < 0 { temp - 1 } else { -1 };
            worst = worst.min(temp);
        }
        current = temp;
    }

    (current, best, worst.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetType, Direction};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ndt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    fn closed(symbol: &str, entry_hour: u32, exit_day: u32, pnl: Decimal) -> Trade {
        let quantity = dec!(1);
        let entry_price = dec!(100);
        let exit_price = entry_price + pnl;
        Trade {
            id: format!("t-{exit_day}-{entry_hour}"),
            broker_trade_id: None,
            symbol: symbol.into(),
            asset_type: AssetType::Stock,
            direction: Direction::Long,
            status: Status::Closed,
            entry_time: ndt(2024, 1, exit_day, entry_hour, 0),
            exit_time: Some(ndt(2024, 1, exit_day, entry_hour + 1, 0)),
            entry_price,
            exit_price: Some(exit_price),
            quantity,
            commission: dec!(0),
            override_pnl: None,
            tags: Default::default(),
            notes: None,
            account_id: None,
            broker_name: None,
            raw_data: None,
        }
    }

    #[test]
    fn empty_collection_has_no_stats() {
        let stats = compute_stats(&TradeCollection::new());
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, None);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let mut collection = TradeCollection::new();
        collection.trades.push(closed("AAPL", 9, 1, dec!(10)));
        collection.trades.push(closed("AAPL", 9, 2, dec!(-5)));
        let stats = compute_stats(&collection);
        assert_eq!(stats.winning_trades, 1);
        assert_eq!(stats.losing_trades, 1);
        assert_eq!(stats.win_rate, Some(50.0));
        assert_eq!(stats.gross_profit, dec!(10));
        assert_eq!(stats.gross_loss, dec!(5));
        assert_eq!(stats.profit_factor, Some(2.0));
    }

    #[test]
    fn profit_factor_is_undefined_with_no_losers() {
        let mut collection = TradeCollection::new();
        collection.trades.push(closed("AAPL", 9, 1, dec!(10)));
        let stats = compute_stats(&collection);
        assert_eq!(stats.profit_factor, None);
    }

    #[test]
    fn daily_pnl_accumulates_cumulative_sum() {
        let mut collection = TradeCollection::new();
        collection.trades.push(closed("AAPL", 9, 1, dec!(10)));
        collection.trades.push(closed("AAPL", 9, 2, dec!(5)));
        let stats = compute_stats(&collection);
        assert_eq!(stats.daily_pnl.len(), 2);
        assert_eq!(stats.daily_pnl[1].cumulative_pnl, dec!(15));
    }

    #[test]
    fn streak_tracks_consecutive_winners() {
        let mut collection = TradeCollection::new();
        collection.trades.push(closed("AAPL", 9, 1, dec!(10)));
        collection.trades.push(closed("AAPL", 9, 2, dec!(10)));
        collection.trades.push(closed("AAPL", 9, 3, dec!(-5)));
        let stats = compute_stats(&collection);
        assert_eq!(stats.best_streak, 2);
        assert_eq!(stats.current_streak, -1);
        assert_eq!(stats.worst_streak, 1);
    }

    #[test]
    fn zero_net_pnl_counts_as_neither_winner_nor_loser() {
        let mut collection = TradeCollection::new();
        collection.trades.push(closed("AAPL", 9, 1, dec!(0)));
        let stats = compute_stats(&collection);
        assert_eq!(stats.winning_trades, 0);
        assert_eq!(stats.losing_trades, 0);
    }
}
