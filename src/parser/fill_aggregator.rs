//! Groups per-fill rows into per-trade records (spec §4.6). Used by
//! parsers whose source rows are individual exchange fills rather than
//! already-paired trades (Binance; Tradovate Order History has its own
//! pairing rule and does not use this module).

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::model::{Direction, Trade};

use super::floor_to_bucket;

/// Groups `fills` by `(symbol, direction, floor(entry_time, bucket))` and
/// merges each group into one trade. Returns the merged trades and the
/// number of input fills that were consumed (for the aggregation
/// warning's "N fills into M trades" accounting).
pub fn aggregate_fills(fills: Vec<Trade>, bucket: Duration) -> (Vec<Trade>, usize) {
    let consumed = fills.len();
    let mut groups: BTreeMap<(String, bool, i64), Vec<Trade>> = BTreeMap::new();

    for fill in fills {
        let bucketed = floor_to_bucket(fill.entry_time, bucket);
        let key = (
            fill.symbol.clone(),
            fill.direction == Direction::Short,
            bucketed.and_utc().timestamp(),
        );
        groups.entry(key).or_default().push(fill);
    }

    let merged = groups.into_values().map(merge_group).collect();
    (merged, consumed)
}

fn merge_group(mut group: Vec<Trade>) -> Trade {
    group.sort_by_key(|t| t.entry_time);

    let mut base = group[0].clone();
    let total_qty: Decimal = group.iter().map(|t| t.quantity).sum();
    let weighted_price: Decimal = group.iter().map(|t| t.entry_price * t.quantity).sum::<Decimal>() / total_qty;
    let total_commission: Decimal = group.iter().map(|t| t.commission).sum();

    let closed_leg = group
        .iter()
        .filter(|t| t.exit_time.is_some() && t.exit_price.is_some())
        .max_by_key(|t| t.exit_time);

    base.quantity = total_qty;
    base.entry_price = weighted_price;
    base.entry_time = group.iter().map(|t| t.entry_time).min().unwrap();
    base.commission = total_commission;
    if let Some(closed) = closed_leg {
        base.exit_time = closed.exit_time;
        base.exit_price = closed.exit_price;
        base.status = closed.status;
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetType, Status};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn fill(minute: u32, second: u32, price: Decimal, qty: Decimal) -> Trade {
        Trade {
            id: format!("f{second}"),
            broker_trade_id: None,
            symbol: "BTC/USDT".into(),
            asset_type: AssetType::Crypto,
            direction: Direction::Long,
            status: Status::Open,
            entry_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, minute, second)
                .unwrap(),
            exit_time: None,
            entry_price: price,
            exit_price: None,
            quantity: qty,
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
    fn scenario_3_binance_aggregation() {
        let fills = vec![
            fill(0, 15, dec!(40000), dec!(0.1)),
            fill(0, 42, dec!(40010), dec!(0.2)),
            fill(0, 51, dec!(40020), dec!(0.3)),
            fill(0, 59, dec!(40030), dec!(0.4)),
        ];
        let (merged, consumed) = aggregate_fills(fills, Duration::from_secs(60));
        assert_eq!(consumed, 4);
        assert_eq!(merged.len(), 1);
        let t = &merged[0];
        assert_eq!(t.quantity, dec!(1.0));
        assert_eq!(t.entry_price, dec!(40020));
        assert_eq!(t.entry_time.format("%H:%M:%S").to_string(), "10:00:15");
    }

    #[test]
    fn conserves_quantity_and_commission() {
        let mut fills = vec![fill(0, 1, dec!(10), dec!(1)), fill(0, 2, dec!(20), dec!(2))];
        fills[0].commission = dec!(0.5);
        fills[1].commission = dec!(1.5);
        let total_qty_before: Decimal = fills.iter().map(|f| f.quantity).sum();
        let total_comm_before: Decimal = fills.iter().map(|f| f.commission).sum();
        let (merged, _) = aggregate_fills(fills, Duration::from_secs(60));
        let total_qty_after: Decimal = merged.iter().map(|t| t.quantity).sum();
        let total_comm_after: Decimal = merged.iter().map(|t| t.commission).sum();
        assert_eq!(total_qty_before, total_qty_after);
        assert_eq!(total_comm_before, total_comm_after);
    }

    #[test]
    fn separate_buckets_stay_separate() {
        let fills = vec![fill(0, 1, dec!(10), dec!(1)), fill(2, 1, dec!(20), dec!(1))];
        let (merged, _) = aggregate_fills(fills, Duration::from_secs(60));
        assert_eq!(merged.len(), 2);
    }
}
