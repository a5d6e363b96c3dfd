//! Core data types and structures

pub mod analytics;
pub mod market;
pub mod observation;
pub mod opportunity;

pub use analytics::*;
pub use market::*;
pub use observation::*;
pub use opportunity::*;

pub type ProductId = i64;
pub type MarketplaceId = i64;
pub type ObservationId = i64;
