//! Opportunity lifecycle maintenance

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use crate::classify::ProductClassifier;
use crate::errors::PipelineResult;
use crate::store::PriceStore;
use crate::types::OpportunityStatus;

/// Retires opportunities that should no longer be acted on: products the
/// classifier has since excluded, and opportunities past their expiry.
pub struct OpportunityLifecycle {
    store: Arc<dyn PriceStore>,
    classifier: Arc<ProductClassifier>,
}

impl OpportunityLifecycle {
    pub fn new(store: Arc<dyn PriceStore>, classifier: Arc<ProductClassifier>) -> Self {
        Self { store, classifier }
    }

    /// Expires every active opportunity whose product is excluded.
    /// Idempotent: a second run over the same state touches nothing.
    pub fn cleanup_excluded_products(&self) -> PipelineResult<usize> {
        let mut expired = 0;
        for opportunity in self.store.active_opportunities()? {
            let product_id = self.store.resolve_product(opportunity.product_id)?;
            if !self.classifier.is_excluded(product_id) {
                continue;
            }

            self.store
                .update_opportunity_status(&opportunity.id, OpportunityStatus::Expired)?;
            let name = self
                .store
                .product(product_id)?
                .map(|p| p.name)
                .unwrap_or_else(|| format!("product {product_id}"));
            info!("🚫 Expired opportunity {} for excluded {}", opportunity.id, name);
            expired += 1;
        }

        if expired > 0 {
            info!("Cleanup pass expired {expired} opportunities on excluded products");
        }
        Ok(expired)
    }

    /// Expires active opportunities whose expiry timestamp has passed.
    pub fn expire_stale(&self) -> PipelineResult<usize> {
        let now = Utc::now();
        let mut expired = 0;
        for opportunity in self.store.active_opportunities()? {
            if opportunity.expires_at > now {
                continue;
            }
            self.store
                .update_opportunity_status(&opportunity.id, OpportunityStatus::Expired)?;
            expired += 1;
        }

        if expired > 0 {
            info!("⌛ Expired {expired} stale opportunities");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierSettings;
    use crate::store::MemoryStore;
    use crate::types::{
        ArbitrageOpportunity, Marketplace, PriceObservation, Product, ProfitBreakdown,
    };
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn opportunity(id: &str, product_id: i64, expires_in_hours: i64) -> ArbitrageOpportunity {
        let now = Utc::now();
        ArbitrageOpportunity {
            id: id.to_string(),
            product_id,
            buy_observation_id: 1,
            sell_observation_id: 2,
            profit_margin: dec!(50),
            absolute_profit: dec!(10),
            risk_score: 0.4,
            status: OpportunityStatus::Active,
            detected_at: now,
            expires_at: now + Duration::hours(expires_in_hours),
            executed_at: None,
            profit: ProfitBreakdown::default(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, OpportunityLifecycle) {
        let store = Arc::new(MemoryStore::new());
        let classifier = Arc::new(ProductClassifier::new(
            store.clone(),
            ClassifierSettings::default(),
        ));
        let lifecycle = OpportunityLifecycle::new(store.clone(), classifier);
        (store, lifecycle)
    }

    #[test]
    fn exclusion_propagates_and_is_idempotent() {
        let (store, lifecycle) = setup();
        store.insert_marketplace(Marketplace {
            id: 1,
            name: "Steam".to_string(),
            reliability: 0.9,
            active: true,
            fees: None,
        });
        store.insert_product(Product {
            id: 1,
            name: "Now Free Game".to_string(),
            identifier: "1001".to_string(),
            replaced_by: None,
        });
        // Free on a trusted marketplace -> excluded
        store
            .insert_observation(PriceObservation {
                id: 1,
                product_id: 1,
                marketplace_id: 1,
                price: dec!(0),
                currency: "EUR".to_string(),
                converted_price: dec!(0),
                region: "EU".to_string(),
                url: None,
                in_stock: true,
                is_sale: false,
                timestamp: Utc::now(),
            })
            .unwrap();
        store.insert_opportunity(opportunity("a", 1, 48)).unwrap();

        assert_eq!(lifecycle.cleanup_excluded_products().unwrap(), 1);
        assert!(store.active_opportunities().unwrap().is_empty());
        assert_eq!(
            store.opportunity("a").unwrap().unwrap().status,
            OpportunityStatus::Expired
        );

        // Second run finds nothing left to do
        assert_eq!(lifecycle.cleanup_excluded_products().unwrap(), 0);
    }

    #[test]
    fn cleanup_leaves_ordinary_products_alone() {
        let (store, lifecycle) = setup();
        store.insert_product(Product {
            id: 1,
            name: "Paid Game".to_string(),
            identifier: "1001".to_string(),
            replaced_by: None,
        });
        store.insert_opportunity(opportunity("a", 1, 48)).unwrap();

        assert_eq!(lifecycle.cleanup_excluded_products().unwrap(), 0);
        assert_eq!(store.active_opportunities().unwrap().len(), 1);
    }

    #[test]
    fn stale_opportunities_expire() {
        let (store, lifecycle) = setup();
        store.insert_opportunity(opportunity("old", 1, -1)).unwrap();
        store.insert_opportunity(opportunity("fresh", 2, 48)).unwrap();

        assert_eq!(lifecycle.expire_stale().unwrap(), 1);
        let active = store.active_opportunities().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "fresh");
    }
}
