//! Opportunity detection and lifecycle

pub mod lifecycle;
pub mod matcher;

pub use lifecycle::*;
pub use matcher::*;
