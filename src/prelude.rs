// 1. Data Model
pub use crate::model::{AssetType, Broker, ChartPoint, Direction, Status, Trade, TradeCollection};

// 2. Parsing
pub use crate::detector::{detect_broker, detect_broker_from_content, detect_broker_from_filename, parse, parser_for};
pub use crate::parser::{parse_bytes, parse_text, BrokerParser, ParseResult};

// 3. Statistics
pub use crate::stats::{compute_stats, DailyPnl, HourlyStats, SymbolStats, TradeStats};

// 4. Configuration
pub use crate::config::{AggregationConfig, DetectionConfig};

// 5. Errors
pub use crate::error::{DateTimeError, FileError, NumberError, RowError, TradeParseError, TradeResult};
