//! Market Arbitrage Bot - Cross-marketplace price arbitrage detection
//!
//! The pipeline ingests price observations collected from game-key
//! marketplaces, normalizes them into a settlement currency, filters out
//! products with no resale value, and pairs the rest into fee-adjusted,
//! risk-scored arbitrage opportunities with notification fan-out.

pub mod config;
pub mod types;
pub mod errors;
pub mod store;
pub mod currency;
pub mod fees;
pub mod classify;
pub mod analytics;
pub mod risk;
pub mod arbitrage;
pub mod notify;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{PipelineError, PipelineResult};
pub use types::*;
