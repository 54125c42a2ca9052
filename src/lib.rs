// === Public Modules (The Canonical Paths) ===
pub mod config;
pub mod datetime;
pub mod decimal;
pub mod detector;
pub mod encoding;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod stats;

// === Convenience ===
pub mod prelude;
