//! Opportunity risk scoring

pub mod scorer;

pub use scorer::*;
