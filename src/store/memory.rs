//! In-memory price store

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use super::{PriceStore, StoreError, StoreResult};
use crate::types::{
    ArbitrageOpportunity, ExchangeRate, Marketplace, MarketplaceId, NotificationRecord,
    ObservationId, OpportunityStatus, PriceObservation, Product, ProductId,
};

#[derive(Default)]
struct Inner {
    observations: HashMap<ObservationId, PriceObservation>,
    next_observation_id: ObservationId,
    products: HashMap<ProductId, Product>,
    marketplaces: HashMap<MarketplaceId, Marketplace>,
    rates: Vec<ExchangeRate>,
    opportunities: HashMap<String, ArbitrageOpportunity>,
    notifications: Vec<NotificationRecord>,
}

/// Thread-safe in-memory implementation of [`PriceStore`].
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_observation_id: 1,
                ..Inner::default()
            }),
        }
    }

    pub fn insert_product(&self, product: Product) {
        self.inner.write().unwrap().products.insert(product.id, product);
    }

    pub fn insert_marketplace(&self, marketplace: Marketplace) {
        self.inner
            .write()
            .unwrap()
            .marketplaces
            .insert(marketplace.id, marketplace);
    }

    pub fn observation_count(&self) -> usize {
        self.inner.read().unwrap().observations.len()
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.inner.read().unwrap().notifications.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn resolve(&self, id: ProductId) -> ProductId {
        let mut current = id;
        // replaced_by chains are short; the hop cap guards against a
        // cyclic catalog file.
        for _ in 0..8 {
            match self.products.get(&current).and_then(|p| p.replaced_by) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }
}

impl PriceStore for MemoryStore {
    fn recent_observations(&self, since: DateTime<Utc>) -> StoreResult<Vec<PriceObservation>> {
        let inner = self.inner.read().unwrap();
        let mut observations: Vec<_> = inner
            .observations
            .values()
            .filter(|o| o.timestamp >= since)
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.id);
        Ok(observations)
    }

    fn product_observations(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceObservation>> {
        let inner = self.inner.read().unwrap();
        let canonical = inner.resolve(product_id);
        let mut observations: Vec<_> = inner
            .observations
            .values()
            .filter(|o| o.timestamp >= since && inner.resolve(o.product_id) == canonical)
            .cloned()
            .collect();
        observations.sort_by_key(|o| o.timestamp);
        Ok(observations)
    }

    fn observation(&self, id: ObservationId) -> StoreResult<Option<PriceObservation>> {
        Ok(self.inner.read().unwrap().observations.get(&id).cloned())
    }

    fn insert_observation(&self, mut observation: PriceObservation) -> StoreResult<ObservationId> {
        let mut inner = self.inner.write().unwrap();
        if observation.id == 0 {
            observation.id = inner.next_observation_id;
        }
        let id = observation.id;
        inner.next_observation_id = inner.next_observation_id.max(id + 1);
        inner.observations.entry(id).or_insert(observation);
        Ok(id)
    }

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.inner.read().unwrap().products.get(&id).cloned())
    }

    fn resolve_product(&self, id: ProductId) -> StoreResult<ProductId> {
        Ok(self.inner.read().unwrap().resolve(id))
    }

    fn marketplace(&self, id: MarketplaceId) -> StoreResult<Option<Marketplace>> {
        Ok(self.inner.read().unwrap().marketplaces.get(&id).cloned())
    }

    fn latest_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<ExchangeRate>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .rates
            .iter()
            .filter(|r| {
                r.from_currency == from_currency
                    && r.to_currency == to_currency
                    && r.timestamp >= since
            })
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    fn rate_history(
        &self,
        from_currency: &str,
        to_currency: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ExchangeRate>> {
        let inner = self.inner.read().unwrap();
        let mut history: Vec<_> = inner
            .rates
            .iter()
            .filter(|r| {
                r.from_currency == from_currency
                    && r.to_currency == to_currency
                    && r.timestamp >= since
            })
            .cloned()
            .collect();
        history.sort_by_key(|r| r.timestamp);
        Ok(history)
    }

    fn put_rate(&self, rate: ExchangeRate) -> StoreResult<()> {
        self.inner.write().unwrap().rates.push(rate);
        Ok(())
    }

    fn insert_opportunity(&self, opportunity: ArbitrageOpportunity) -> StoreResult<()> {
        self.inner
            .write()
            .unwrap()
            .opportunities
            .insert(opportunity.id.clone(), opportunity);
        Ok(())
    }

    fn active_opportunities(&self) -> StoreResult<Vec<ArbitrageOpportunity>> {
        let inner = self.inner.read().unwrap();
        let mut active: Vec<_> = inner
            .opportunities
            .values()
            .filter(|o| o.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|o| o.detected_at);
        Ok(active)
    }

    fn opportunity(&self, id: &str) -> StoreResult<Option<ArbitrageOpportunity>> {
        Ok(self.inner.read().unwrap().opportunities.get(id).cloned())
    }

    fn update_opportunity_status(&self, id: &str, status: OpportunityStatus) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let opportunity = inner
            .opportunities
            .get_mut(id)
            .ok_or_else(|| StoreError::MissingOpportunity(id.to_string()))?;
        opportunity.status = status;
        if status == OpportunityStatus::Executed {
            opportunity.executed_at = Some(Utc::now());
        }
        Ok(())
    }

    fn record_notification(&self, record: NotificationRecord) -> StoreResult<()> {
        self.inner.write().unwrap().notifications.push(record);
        Ok(())
    }
}
