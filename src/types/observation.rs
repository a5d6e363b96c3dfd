//! Price observation and exchange rate types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::{MarketplaceId, ObservationId, ProductId};

/// A single observed price for a product on one marketplace.
/// Observations are immutable once recorded; the store is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: ObservationId,
    pub product_id: ProductId,
    pub marketplace_id: MarketplaceId,
    pub price: Decimal,
    pub currency: String,
    /// Price in the settlement currency, filled by the acquisition
    /// collaborator at record time.
    pub converted_price: Decimal,
    pub region: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    /// Observed during a sale or promotion
    #[serde(default)]
    pub is_sale: bool,
    pub timestamp: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl PriceObservation {
    /// Scrapers record a negative price when a listing exists but no
    /// price could be extracted. Such observations never pair.
    pub fn is_unavailable(&self) -> bool {
        self.price.is_sign_negative()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub timestamp: DateTime<Utc>,
}
