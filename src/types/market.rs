//! Marketplace and product catalog types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::{MarketplaceId, ProductId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marketplace {
    pub id: MarketplaceId,
    pub name: String,
    #[serde(default = "default_reliability")]
    pub reliability: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub fees: Option<FeeSchedule>,
}

fn default_reliability() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

/// Fee schedule for a marketplace. Every component is optional; a
/// marketplace without a schedule contributes zero fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Percentage of price
    #[serde(default)]
    pub platform_fee: Option<Decimal>,
    #[serde(default)]
    pub transaction_fee: Option<TransactionFee>,
    /// Payment processing fee, percentage of price
    #[serde(default)]
    pub payment_fee: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionFee {
    Fixed(Decimal),
    Percentage(Decimal),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Stable external identifier (e.g. the marketplace catalog key)
    pub identifier: String,
    /// Catalog id that superseded this one. Observations recorded under
    /// either id resolve to the same logical product during matching.
    #[serde(default)]
    pub replaced_by: Option<ProductId>,
}
