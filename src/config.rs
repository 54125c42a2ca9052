//! Ambient configuration knobs. There is no environment/runtime config in
//! this crate — callers own that — these are plain `Default`-able structs
//! a caller may override before invoking a parser or the fill aggregator.

use std::time::Duration;

/// Configures the fill aggregator's grouping granularity (spec §9: "the
/// 1-minute bucket is a policy choice... expose as a configurable
/// aggregation granularity").
#[derive(Debug, Clone, Copy)]
pub struct AggregationConfig {
    pub bucket: Duration,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            bucket: Duration::from_secs(60),
        }
    }
}

/// Per-broker content-signature thresholds used by the detector (spec
/// §4.5). Exposed as data rather than hard-coded so a caller can tune
/// detection for a non-standard export without forking the detector.
#[derive(Debug, Clone, Copy)]
pub struct DetectionConfig {
    pub ninja_trader_threshold: usize,
    pub tradovate_threshold: usize,
    pub metatrader_threshold: usize,
    pub binance_threshold: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ninja_trader_threshold: 2,
            tradovate_threshold: 2,
            metatrader_threshold: 3,
            binance_threshold: 2,
        }
    }
}
