//! Free-to-play / invalid product filter

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use crate::config::{DEFAULT_TRUSTED_MARKETPLACES, FREE_PRICE_THRESHOLD};
use crate::store::PriceStore;
use crate::types::ProductId;

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Marketplaces whose pricing is authoritative enough to flag a
    /// product as free-to-play, lowercase.
    pub trusted_marketplaces: Vec<String>,
    pub free_price_threshold: Decimal,
    pub lookback: Duration,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            trusted_marketplaces: DEFAULT_TRUSTED_MARKETPLACES
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            free_price_threshold: FREE_PRICE_THRESHOLD,
            lookback: Duration::hours(24),
        }
    }
}

/// Heuristic filter for products with no resale value. A product is
/// excluded when any trusted marketplace recently listed it below the
/// near-zero threshold. Results are cached for the process lifetime;
/// [`crate::arbitrage::OpportunityLifecycle`] handles retroactive cleanup
/// when a product is classified after opportunities already exist.
pub struct ProductClassifier {
    store: Arc<dyn PriceStore>,
    settings: ClassifierSettings,
    cache: RwLock<HashMap<ProductId, bool>>,
}

impl ProductClassifier {
    pub fn new(store: Arc<dyn PriceStore>, settings: ClassifierSettings) -> Self {
        Self {
            store,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_excluded(&self, product_id: ProductId) -> bool {
        if let Some(&excluded) = self.cache.read().unwrap().get(&product_id) {
            return excluded;
        }

        match self.classify(product_id) {
            Ok(Some(excluded)) => {
                self.cache.write().unwrap().insert(product_id, excluded);
                excluded
            }
            // Not enough data to classify; don't pin the answer.
            Ok(None) => false,
            Err(e) => {
                warn!("Exclusion check failed for product {product_id}: {e}");
                false
            }
        }
    }

    /// `None` means no classification could be made (unknown product or no
    /// recent observations); absence of data is not exclusion.
    fn classify(&self, product_id: ProductId) -> crate::store::StoreResult<Option<bool>> {
        let Some(product) = self.store.product(product_id)? else {
            return Ok(None);
        };

        let since = Utc::now() - self.settings.lookback;
        let recent = self.store.product_observations(product_id, since)?;
        if recent.is_empty() {
            return Ok(None);
        }

        for observation in &recent {
            if observation.is_unavailable() {
                continue;
            }
            if observation.price >= self.settings.free_price_threshold {
                continue;
            }

            let Some(marketplace) = self.store.marketplace(observation.marketplace_id)? else {
                continue;
            };
            let name = marketplace.name.to_lowercase();
            if self.settings.trusted_marketplaces.iter().any(|t| *t == name) {
                info!(
                    "Detected free/invalid product: '{}' on {} (price: {})",
                    product.name, marketplace.name, observation.price
                );
                return Ok(Some(true));
            }
        }

        Ok(Some(false))
    }
}
