//! Marketplace fee modeling

pub mod calculator;

pub use calculator::*;
