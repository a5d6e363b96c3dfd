//! Arbitrage opportunity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::{ObservationId, ProductId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Active,
    Expired,
    Executed,
    Successful,
    Failed,
}

/// Fees computed for one side of a trade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_fee: Option<Decimal>,
}

impl FeeBreakdown {
    pub fn total(&self) -> Decimal {
        self.platform_fee.unwrap_or_default()
            + self.transaction_fee.unwrap_or_default()
            + self.payment_fee.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeQuote {
    pub total: Decimal,
    pub breakdown: FeeBreakdown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    pub gross_profit: Decimal,
    pub total_fees: Decimal,
    pub net_profit: Decimal,
    pub buy_fees: FeeBreakdown,
    pub sell_fees: FeeBreakdown,
}

/// A detected cross-marketplace arbitrage opportunity.
///
/// The buy/sell roles are fixed at creation: buy is the cheaper converted
/// observation, sell the costlier. They are never re-derived downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub product_id: ProductId,
    pub buy_observation_id: ObservationId,
    pub sell_observation_id: ObservationId,
    /// Net profit relative to the buy price, percent
    pub profit_margin: Decimal,
    /// Net profit in the settlement currency
    pub absolute_profit: Decimal,
    /// Composite risk estimate in [0, 1], higher = riskier
    pub risk_score: f64,
    pub status: OpportunityStatus,
    pub detected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    pub profit: ProfitBreakdown,
}

impl ArbitrageOpportunity {
    pub fn is_active(&self) -> bool {
        self.status == OpportunityStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTag {
    pub amount: Decimal,
    pub currency: String,
}

/// Flattened, display-ready view of an opportunity for the dashboard feed
/// and the notification payload. Source is the buy side, target the sell
/// side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunitySnapshot {
    pub id: String,
    pub product_name: String,
    pub profit_margin: Decimal,
    pub absolute_profit: Decimal,
    pub risk_score: f64,
    pub source_marketplace: String,
    pub target_marketplace: String,
    pub source_price: PriceTag,
    pub target_price: PriceTag,
    pub detected_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub fee_breakdown: ProfitBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// Delivery outcome for one notification channel, kept for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub opportunity_id: String,
    pub channel: String,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub sent_at: DateTime<Utc>,
}
