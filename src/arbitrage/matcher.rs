//! Cross-marketplace opportunity matching

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use crate::classify::ProductClassifier;
use crate::config::{
    DEFAULT_MAX_HOLD_TIME_HOURS, DEFAULT_MAX_INVESTMENT, DEFAULT_MIN_ABSOLUTE_PROFIT,
    DEFAULT_MIN_PROFIT_MARGIN, DEFAULT_OBSERVATION_WINDOW_SECS,
};
use crate::currency::{CurrencyNormalizer, NormalizerSettings};
use crate::errors::PipelineResult;
use crate::fees::FeeModel;
use crate::risk::RiskScorer;
use crate::store::PriceStore;
use crate::types::{
    ArbitrageOpportunity, ObservationId, OpportunityStatus, PriceObservation, ProductId,
};

#[derive(Debug, Clone)]
pub struct MatcherSettings {
    /// Reject below this margin, percent. The boundary itself is accepted.
    pub min_profit_margin: Decimal,
    /// Reject below this net profit in the settlement currency.
    pub min_absolute_profit: Decimal,
    /// Skip buy candidates whose converted price exceeds this.
    pub max_investment: Decimal,
    pub max_hold_time: Duration,
    pub observation_window: Duration,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            min_profit_margin: DEFAULT_MIN_PROFIT_MARGIN,
            min_absolute_profit: DEFAULT_MIN_ABSOLUTE_PROFIT,
            max_investment: DEFAULT_MAX_INVESTMENT,
            max_hold_time: Duration::hours(DEFAULT_MAX_HOLD_TIME_HOURS),
            observation_window: Duration::seconds(DEFAULT_OBSERVATION_WINDOW_SECS),
        }
    }
}

/// An observation that survived screening, with its converted price and
/// resolved (canonical) product id.
struct Candidate {
    observation: PriceObservation,
    converted: Decimal,
    product_id: ProductId,
}

/// Pairs same-product observations across marketplaces and turns
/// sufficiently profitable, fee-adjusted pairs into opportunity records.
pub struct OpportunityMatcher {
    store: Arc<dyn PriceStore>,
    classifier: Arc<ProductClassifier>,
    normalizer: CurrencyNormalizer,
    fees: FeeModel,
    scorer: RiskScorer,
    settings: MatcherSettings,
}

impl OpportunityMatcher {
    pub fn new(
        store: Arc<dyn PriceStore>,
        classifier: Arc<ProductClassifier>,
        normalizer_settings: NormalizerSettings,
        settings: MatcherSettings,
    ) -> Self {
        Self {
            normalizer: CurrencyNormalizer::new(store.clone(), normalizer_settings),
            fees: FeeModel::new(store.clone()),
            scorer: RiskScorer::new(store.clone()),
            store,
            classifier,
            settings,
        }
    }

    /// Runs one detection pass over the recent observation window.
    ///
    /// Store failure at the window fetch aborts the pass; everything after
    /// that degrades per item. Returned opportunities are not yet
    /// persisted; that belongs to the caller.
    pub fn find_opportunities(&self) -> PipelineResult<Vec<ArbitrageOpportunity>> {
        let now = Utc::now();
        let since = now - self.settings.observation_window;
        let recent = self.store.recent_observations(since)?;
        let total = recent.len();

        let candidates = self.screen(recent)?;

        let mut processed: HashSet<(ObservationId, ObservationId)> = HashSet::new();
        let mut opportunities = Vec::new();

        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                if a.product_id != b.product_id
                    || a.observation.marketplace_id == b.observation.marketplace_id
                {
                    continue;
                }

                let key = (
                    a.observation.id.min(b.observation.id),
                    a.observation.id.max(b.observation.id),
                );
                if !processed.insert(key) {
                    continue;
                }

                // Canonical roles: the cheaper converted price buys, the
                // costlier sells. Equal prices carry no edge.
                let (buy, sell) = if a.converted < b.converted {
                    (a, b)
                } else if b.converted < a.converted {
                    (b, a)
                } else {
                    continue;
                };

                if let Some(opportunity) = self.analyze_pair(buy, sell, now) {
                    opportunities.push(opportunity);
                }
            }
        }

        info!(
            "Detection pass: {} observations, {} candidates, {} opportunities",
            total,
            candidates.len(),
            opportunities.len()
        );
        Ok(opportunities)
    }

    /// Applies the per-observation filters: excluded products, unavailable
    /// sentinels, failed conversions and prices above the investment cap.
    fn screen(&self, observations: Vec<PriceObservation>) -> PipelineResult<Vec<Candidate>> {
        let mut candidates = Vec::with_capacity(observations.len());
        let mut excluded_products: HashSet<ProductId> = HashSet::new();

        for observation in observations {
            let product_id = self.store.resolve_product(observation.product_id)?;

            if excluded_products.contains(&product_id) {
                continue;
            }
            if self.classifier.is_excluded(product_id) {
                debug!("Skipping excluded product {product_id}");
                excluded_products.insert(product_id);
                continue;
            }

            if observation.is_unavailable() {
                debug!("Skipping observation {} with unavailable price", observation.id);
                continue;
            }

            let Some(converted) = self
                .normalizer
                .convert_to_settlement(observation.price, &observation.currency)
            else {
                debug!(
                    "Skipping observation {}: no conversion from {}",
                    observation.id, observation.currency
                );
                continue;
            };

            if converted > self.settings.max_investment {
                debug!(
                    "Skipping observation {}: converted price {} exceeds max investment",
                    observation.id, converted
                );
                continue;
            }

            candidates.push(Candidate {
                observation,
                converted,
                product_id,
            });
        }

        Ok(candidates)
    }

    fn analyze_pair(
        &self,
        buy: &Candidate,
        sell: &Candidate,
        now: DateTime<Utc>,
    ) -> Option<ArbitrageOpportunity> {
        if buy.converted <= Decimal::ZERO {
            return None;
        }

        let profit = self.fees.calculate_net_profit(
            buy.converted,
            sell.converted,
            buy.observation.marketplace_id,
            sell.observation.marketplace_id,
        );

        let margin = profit.net_profit / buy.converted * dec!(100);
        if margin < self.settings.min_profit_margin
            || profit.net_profit < self.settings.min_absolute_profit
        {
            return None;
        }

        let risk_score = self.scorer.score(&buy.observation, &sell.observation);

        Some(ArbitrageOpportunity {
            id: Uuid::new_v4().to_string(),
            product_id: buy.product_id,
            buy_observation_id: buy.observation.id,
            sell_observation_id: sell.observation.id,
            profit_margin: margin,
            absolute_profit: profit.net_profit,
            risk_score,
            status: OpportunityStatus::Active,
            detected_at: now,
            expires_at: now + self.settings.max_hold_time,
            executed_at: None,
            profit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierSettings;
    use crate::store::MemoryStore;
    use crate::types::{FeeSchedule, Marketplace, Product, TransactionFee};

    fn seed_marketplaces(store: &MemoryStore, fees: Option<FeeSchedule>) {
        for (id, name) in [(1, "Steam"), (2, "GOG"), (3, "Humble")] {
            store.insert_marketplace(Marketplace {
                id,
                name: name.to_string(),
                reliability: 0.8,
                active: true,
                fees: fees.clone(),
            });
        }
    }

    fn seed_product(store: &MemoryStore, id: ProductId) {
        store.insert_product(Product {
            id,
            name: format!("Game {id}"),
            identifier: format!("{}", 1000 + id),
            replaced_by: None,
        });
    }

    fn observe(
        store: &MemoryStore,
        id: ObservationId,
        product_id: ProductId,
        marketplace_id: i64,
        price: Decimal,
        currency: &str,
    ) {
        store
            .insert_observation(PriceObservation {
                id,
                product_id,
                marketplace_id,
                price,
                currency: currency.to_string(),
                converted_price: price,
                region: "EU".to_string(),
                url: None,
                in_stock: true,
                is_sale: false,
                timestamp: Utc::now() - Duration::minutes(10),
            })
            .unwrap();
    }

    fn matcher(store: Arc<MemoryStore>, settings: MatcherSettings) -> OpportunityMatcher {
        let classifier = Arc::new(ProductClassifier::new(
            store.clone(),
            ClassifierSettings::default(),
        ));
        OpportunityMatcher::new(store, classifier, NormalizerSettings::default(), settings)
    }

    fn lenient_settings() -> MatcherSettings {
        MatcherSettings {
            min_profit_margin: dec!(10),
            min_absolute_profit: dec!(5),
            ..MatcherSettings::default()
        }
    }

    #[test]
    fn end_to_end_scenario_produces_one_opportunity() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 1, 2, dec!(30), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert_eq!(found.len(), 1);

        let opportunity = &found[0];
        assert_eq!(opportunity.buy_observation_id, 2);
        assert_eq!(opportunity.sell_observation_id, 1);
        assert_eq!(opportunity.absolute_profit, dec!(20));
        // 20 / 30 * 100 ~ 66.7%
        let margin = opportunity.profit_margin;
        assert!(margin > dec!(66.6) && margin < dec!(66.7));
        assert_eq!(opportunity.status, OpportunityStatus::Active);
        assert!((0.0..=1.0).contains(&opportunity.risk_score));
    }

    #[test]
    fn each_unordered_pair_is_evaluated_once() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 1, 2, dec!(30), "EUR");
        observe(&store, 3, 1, 3, dec!(47), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        let mut keys: Vec<_> = found
            .iter()
            .map(|o| (o.buy_observation_id, o.sell_observation_id))
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), found.len());
        // 30->50, 30->47 and 47->50; the last fails the absolute profit floor
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn margin_boundary_is_inclusive() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        // Exactly 10% margin: buy 100, sell 110
        observe(&store, 1, 1, 1, dec!(100), "EUR");
        observe(&store, 2, 1, 2, dec!(110), "EUR");

        let settings = MatcherSettings {
            min_absolute_profit: dec!(1),
            ..lenient_settings()
        };
        let found = matcher(store, settings).find_opportunities().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].profit_margin, dec!(10));
    }

    #[test]
    fn margin_strictly_below_minimum_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(100), "EUR");
        observe(&store, 2, 1, 2, dec!(109.99), "EUR");

        let settings = MatcherSettings {
            min_absolute_profit: dec!(1),
            ..lenient_settings()
        };
        let found = matcher(store, settings).find_opportunities().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn fees_can_erase_an_opportunity() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(
            &store,
            Some(FeeSchedule {
                platform_fee: Some(dec!(30)),
                transaction_fee: Some(TransactionFee::Fixed(dec!(5))),
                payment_fee: None,
            }),
        );
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 1, 2, dec!(30), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn unavailable_and_unconvertible_observations_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(-1), "EUR");
        observe(&store, 2, 1, 2, dec!(30), "EUR");
        // No stored rate or fallback for GBP
        observe(&store, 3, 1, 3, dec!(80), "GBP");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn buy_side_above_max_investment_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(1500), "EUR");
        observe(&store, 2, 1, 2, dec!(2500), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn excluded_products_never_pair() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        // A trusted marketplace lists it free
        observe(&store, 1, 1, 1, dec!(0), "EUR");
        observe(&store, 2, 1, 2, dec!(30), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn cross_currency_pair_converts_before_comparing() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        // 40 USD -> 37.20 EUR via the fallback rate, cheaper than 50 EUR
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 1, 2, dec!(40), "USD");

        let settings = MatcherSettings {
            min_profit_margin: dec!(10),
            min_absolute_profit: dec!(5),
            ..MatcherSettings::default()
        };
        let found = matcher(store, settings).find_opportunities().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].buy_observation_id, 2);
        assert_eq!(found[0].absolute_profit, dec!(12.80));
    }

    #[test]
    fn superseded_ids_match_as_one_product() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        store.insert_product(Product {
            id: 1,
            name: "Game (old listing)".to_string(),
            identifier: "1001".to_string(),
            replaced_by: Some(2),
        });
        seed_product(&store, 2);
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 2, 2, dec!(30), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].product_id, 2);
    }

    #[test]
    fn same_marketplace_observations_never_pair() {
        let store = Arc::new(MemoryStore::new());
        seed_marketplaces(&store, None);
        seed_product(&store, 1);
        observe(&store, 1, 1, 1, dec!(50), "EUR");
        observe(&store, 2, 1, 1, dec!(30), "EUR");

        let found = matcher(store, lenient_settings()).find_opportunities().unwrap();
        assert!(found.is_empty());
    }
}
