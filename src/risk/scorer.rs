//! Composite risk scoring for opportunity pairs

use chrono::{Duration, Utc};
use rust_decimal::prelude::*;
use std::sync::Arc;
use tracing::warn;
use crate::config::DEFAULT_HISTORY_WINDOW_DAYS;
use crate::store::{PriceStore, StoreResult};
use crate::types::{MarketplaceId, PriceObservation, ProductId};

const VOLATILITY_WEIGHT: f64 = 0.3;
const RELIABILITY_WEIGHT: f64 = 0.3;
const TIME_SENSITIVITY_WEIGHT: f64 = 0.2;
const CURRENCY_RISK_WEIGHT: f64 = 0.2;

/// Neutral factor when history is missing or a lookup fails.
const NEUTRAL_RISK: f64 = 0.5;

const DEFAULT_RELIABILITY: f64 = 0.8;

/// Weighted composite of price volatility, marketplace reliability, sale
/// time-sensitivity and currency risk. Scoring never aborts opportunity
/// creation: any internal failure degrades to the neutral 0.5.
pub struct RiskScorer {
    store: Arc<dyn PriceStore>,
    history_days: i64,
}

impl RiskScorer {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self {
            store,
            history_days: DEFAULT_HISTORY_WINDOW_DAYS,
        }
    }

    pub fn with_history_days(store: Arc<dyn PriceStore>, history_days: i64) -> Self {
        Self { store, history_days }
    }

    pub fn score(&self, buy: &PriceObservation, sell: &PriceObservation) -> f64 {
        match self.try_score(buy, sell) {
            Ok(score) => score.clamp(0.0, 1.0),
            Err(e) => {
                warn!(
                    "Risk scoring failed for observations {}/{}: {e}",
                    buy.id, sell.id
                );
                NEUTRAL_RISK
            }
        }
    }

    fn try_score(&self, buy: &PriceObservation, sell: &PriceObservation) -> StoreResult<f64> {
        let volatility = self.price_volatility(buy.product_id)?;
        let reliability = self.marketplace_reliability(buy.marketplace_id)?;
        let time_sensitivity = if buy.is_sale || sell.is_sale { 0.7 } else { 0.3 };
        let currency_risk = self.currency_risk(&buy.currency, &sell.currency)?;

        Ok(volatility * VOLATILITY_WEIGHT
            + reliability * RELIABILITY_WEIGHT
            + time_sensitivity * TIME_SENSITIVITY_WEIGHT
            + currency_risk * CURRENCY_RISK_WEIGHT)
    }

    /// Normalized std/mean of recent converted prices, clamped to [0, 1].
    fn price_volatility(&self, product_id: ProductId) -> StoreResult<f64> {
        let since = Utc::now() - Duration::days(self.history_days);
        let history = self.store.product_observations(product_id, since)?;

        let prices: Vec<f64> = history
            .iter()
            .filter(|o| !o.is_unavailable())
            .filter_map(|o| o.converted_price.to_f64())
            .collect();
        if prices.is_empty() {
            return Ok(NEUTRAL_RISK);
        }

        Ok(normalized_dispersion(&prices))
    }

    fn marketplace_reliability(&self, marketplace_id: MarketplaceId) -> StoreResult<f64> {
        Ok(self
            .store
            .marketplace(marketplace_id)?
            .map(|m| m.reliability)
            .unwrap_or(DEFAULT_RELIABILITY))
    }

    /// 0.1 for same-currency pairs; otherwise the dispersion of recent
    /// exchange-rate history, neutral when no history exists.
    fn currency_risk(&self, buy_currency: &str, sell_currency: &str) -> StoreResult<f64> {
        if buy_currency == sell_currency {
            return Ok(0.1);
        }

        let since = Utc::now() - Duration::days(self.history_days);
        let history = self.store.rate_history(buy_currency, sell_currency, since)?;
        let rates: Vec<f64> = history.iter().filter_map(|r| r.rate.to_f64()).collect();
        if rates.is_empty() {
            return Ok(NEUTRAL_RISK);
        }

        Ok(normalized_dispersion(&rates))
    }
}

fn normalized_dispersion(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (variance.sqrt() / mean).min(1.0)
}
