//! Historical price analytics

pub mod prediction;
pub mod price_history;

pub use prediction::*;
pub use price_history::*;
