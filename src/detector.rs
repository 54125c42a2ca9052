//! Broker format detection: filename hints first, content signatures as
//! a fallback (spec §4.5). Also the parser lookup table ties a detected
//! [`Broker`] back to its [`BrokerParser`] implementation.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::DetectionConfig;
use crate::model::Broker;
use crate::parser::{binance::BinanceParser, generic::GenericParser, interactive_brokers::InteractiveBrokersParser};
use crate::parser::{metatrader::MetaTraderParser, ninja_trader::NinjaTraderParser, tradovate::TradovateParser};
use crate::parser::{parse_bytes, BrokerParser, ParseResult};

/// IB account-number token (e.g. `U1234567`).
static IB_ACCOUNT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"u\d+").unwrap());

/// Ordered filename-stem substring checks; first match wins.
pub fn detect_broker_from_filename(filename: &str) -> Option<Broker> {
    let stem = filename.to_lowercase();

    if stem.contains("interactive") || stem.contains("ib_") || stem.contains("ibkr") {
        return Some(Broker::InteractiveBrokers);
    }
    if stem.contains("metatrader") || stem.contains("mt4") || stem.contains("mt5") {
        return Some(Broker::MetaTrader4);
    }
    if stem.contains("binance") {
        return Some(Broker::Binance);
    }
    if stem.contains("ninja") || stem.contains("nt8") {
        return Some(Broker::NinjaTrader);
    }
    if stem.contains("tradovate") {
        return Some(Broker::Tradovate);
    }
    None
}

/// Signature-counting fallback over the first few lines of a file
/// (spec §4.5): each broker has an ordered-priority signature list and a
/// minimum-hit threshold, with a couple of short-circuit exact checks.
pub fn detect_broker_from_content(content: &str, config: &DetectionConfig) -> Broker {
    let lower = content.to_lowercase();

    const IB_SIGNATURES: &[&str] = &[
        "ibcommission",
        "ibtradeid",
        "account management",
        "flex query",
        "statement,header",
    ];
    if IB_SIGNATURES.iter().any(|sig| lower.contains(sig)) || IB_ACCOUNT_TOKEN.is_match(&lower) {
        return Broker::InteractiveBrokers;
    }

    const NT_SIGNATURES: &[&str] = &[
        "market pos.",
        "market position",
        "entry name",
        "exit name",
        "mae",
        "mfe",
        "etd",
        "cum. profit",
        "trade #",
        "ninjatrader",
    ];
    let nt_count = NT_SIGNATURES.iter().filter(|sig| lower.contains(**sig)).count();
    if nt_count >= config.ninja_trader_threshold {
        return Broker::NinjaTrader;
    }

    if lower.contains("contract") && lower.contains("b/s") && lower.contains("qty") {
        return Broker::Tradovate;
    }
    if lower.contains("buyprice") && lower.contains("sellprice") && lower.contains("boughttimestamp") {
        return Broker::Tradovate;
    }
    const TRADOVATE_SIGNATURES: &[&str] = &[
        "tradovate",
        "contractid",
        "ordstatus",
        "ordtype",
        "avgfillprice",
        "filledqty",
        "b/s",
        "cumulative p&l",
        "contract",
        "commission",
    ];
    let tradovate_count = TRADOVATE_SIGNATURES.iter().filter(|sig| lower.contains(**sig)).count();
    if tradovate_count >= config.tradovate_threshold {
        return Broker::Tradovate;
    }

    const MT_SIGNATURES: &[&str] = &["ticket", "open time", "close time", "swap", "t/p", "s/l"];
    let mt_count = MT_SIGNATURES.iter().filter(|sig| lower.contains(**sig)).count();
    if mt_count >= config.metatrader_threshold {
        return Broker::MetaTrader4;
    }

    const BINANCE_SIGNATURES: &[&str] =
        &["date(utc)", "pair", "binance", "quote quantity", "commission asset", "busd", "usdt", "bnb"];
    let binance_count = BINANCE_SIGNATURES.iter().filter(|sig| lower.contains(**sig)).count();
    if binance_count >= config.binance_threshold {
        return Broker::Binance;
    }

    Broker::Generic
}

/// Filename hint first, then the first few lines of content, falling
/// back to `Generic`.
pub fn detect_broker(filename: Option<&str>, content: &str, config: &DetectionConfig) -> Broker {
    if let Some(name) = filename
        && let Some(broker) = detect_broker_from_filename(name) {
            return broker;
        }
    let preview: String = content.lines().take(5).collect::<Vec<_>>().join("\n");
    detect_broker_from_content(&preview, config)
}

/// Builds the `BrokerParser` implementation for a detected/chosen broker.
pub fn parser_for(broker: Broker) -> Box<dyn BrokerParser> {
    match broker {
        Broker::InteractiveBrokers => Box::new(InteractiveBrokersParser),
        Broker::MetaTrader4 => Box::new(MetaTraderParser::mt4()),
        Broker::MetaTrader5 => Box::new(MetaTraderParser::mt5()),
        Broker::Binance => Box::new(BinanceParser::default()),
        Broker::NinjaTrader => Box::new(NinjaTraderParser),
        Broker::Tradovate => Box::new(TradovateParser::default()),
        Broker::Generic
        | Broker::Coinbase
        | Broker::TopstepX
        | Broker::ThinkOrSwim
        | Broker::Webull
        | Broker::Robinhood
        | Broker::Etrade
        | Broker::TradeStation => Box::new(GenericParser),
    }
}

/// End-to-end entry point: detect (unless `broker` is given), pick the
/// parser, and parse.
pub fn parse(
    bytes: &[u8],
    filename: Option<&str>,
    account_id: Option<&str>,
    broker: Option<Broker>,
    config: &DetectionConfig,
) -> ParseResult {
    let broker = match broker {
        Some(b) => b,
        None => {
            let preview = String::from_utf8_lossy(bytes);
            detect_broker(filename, &preview, config)
        }
    };
    let parser = parser_for(broker);
    parse_bytes(parser.as_ref(), bytes, filename, account_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_hint_takes_precedence() {
        assert_eq!(detect_broker_from_filename("ibkr_export_2024.csv"), Some(Broker::InteractiveBrokers));
        assert_eq!(detect_broker_from_filename("MT5_statement.csv"), Some(Broker::MetaTrader4));
        assert_eq!(detect_broker_from_filename("my_trades.csv"), None);
    }

    #[test]
    fn scenario_6_content_detection_precedence() {
        let config = DetectionConfig::default();
        let mt_content = "Ticket,Open Time,Type,Size,Symbol,Price,S/L,T/P,Close Time,Close Price,Swap\n";
        assert_eq!(detect_broker_from_content(mt_content, &config), Broker::MetaTrader4);

        let nt_content = "Trade #,Instrument,Market pos.,Entry name,Exit name,MAE,MFE\n";
        assert_eq!(detect_broker_from_content(nt_content, &config), Broker::NinjaTrader);

        let generic_content = "symbol,direction,entry_time,entry_price,quantity\n";
        assert_eq!(detect_broker_from_content(generic_content, &config), Broker::Generic);
    }

    #[test]
    fn ib_signature_short_circuits_before_other_counts() {
        let config = DetectionConfig::default();
        let content = "Symbol,IBCommission,IBTradeID,Quantity\n";
        assert_eq!(detect_broker_from_content(content, &config), Broker::InteractiveBrokers);
    }

    #[test]
    fn ib_account_token_short_circuits_with_no_other_signatures() {
        let config = DetectionConfig::default();
        let content = "Account,Symbol,Quantity,Price\nU1234567,AAPL,100,150.50\n";
        assert_eq!(detect_broker_from_content(content, &config), Broker::InteractiveBrokers);
    }
}
