//! End-to-end coverage of `detector::parse`: raw bytes in, canonical
//! `Trade`s out, broker auto-detected from content alone.

use rust_decimal_macros::dec;
use trade_ledger::prelude::*;

#[test]
fn detects_and_parses_a_generic_export_without_a_filename_hint() {
    let csv = b"symbol,direction,entry_time,exit_time,entry_price,exit_price,quantity,commission\n\
                AAPL,long,2024-01-15 10:30:00,2024-01-15 14:45:00,150.50,152.30,100,2.00\n";

    let config = DetectionConfig::default();
    let result = parse(csv, None, None, None, &config);

    assert!(result.success());
    assert_eq!(result.trades.trades[0].symbol, "AAPL");
    assert_eq!(result.trades.trades[0].pnl_net(), Some(dec!(178.00)));
}

#[test]
fn detects_interactive_brokers_from_content_signatures() {
    let csv = b"Symbol,Quantity,Price,IBCommission,IBTradeID,AssetClass,DateTime\n\
                AAPL,-100,152.30,1.00,T123,STK,2024-01-15 14:45:00\n";

    let config = DetectionConfig::default();
    let result = parse(csv, None, None, None, &config);

    assert!(result.success());
    assert_eq!(result.trades.trades[0].direction, Direction::Short);
    assert_eq!(result.trades.trades[0].asset_type, AssetType::Stock);
}

#[test]
fn filename_hint_overrides_content_when_both_present() {
    let csv = b"symbol,direction,entry_time,entry_price,quantity\nEURUSD,long,2024-01-15 10:30:00,1.0850,1\n";

    let config = DetectionConfig::default();
    let result = parse(csv, Some("ibkr_export.csv"), None, None, &config);

    // The IB parser requires its own columns; forcing it via filename on
    // generic-shaped content surfaces as a row/header error, not a panic.
    assert_eq!(result.trades.trades.len(), 0);
}

#[test]
fn explicit_broker_choice_skips_detection_entirely() {
    let csv = b"Ticket,Open Time,Type,Size,Symbol,Price,S/L,T/P,Close Time,Close Price,Commission,Swap,Profit\n\
                101,2024.03.04 09:30:00,buy,0.10,EURUSD,1.08500,,,2024.03.04 10:15:00,1.08700,0.00,0.00,2.00\n";

    let config = DetectionConfig::default();
    let result = parse(csv, None, Some("acct-1"), Some(Broker::MetaTrader4), &config);

    assert!(result.success());
    assert_eq!(result.trades.trades[0].asset_type, AssetType::Forex);
}
