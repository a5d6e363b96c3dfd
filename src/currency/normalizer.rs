//! Currency normalization with a short-lived rate cache

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};
use crate::store::PriceStore;
use crate::types::ExchangeRate;
use crate::config::{default_fallback_rates, DEFAULT_RATE_VALIDITY_SECS, DEFAULT_SETTLEMENT_CURRENCY};

#[derive(Debug, Clone)]
pub struct NormalizerSettings {
    pub settlement_currency: String,
    /// A stored rate older than this is ignored.
    pub rate_validity: Duration,
    /// Rates of last resort, keyed "FROM:TO".
    pub fallback_rates: HashMap<String, Decimal>,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            settlement_currency: DEFAULT_SETTLEMENT_CURRENCY.to_string(),
            rate_validity: Duration::seconds(DEFAULT_RATE_VALIDITY_SECS),
            fallback_rates: default_fallback_rates(),
        }
    }
}

struct CachedRate {
    rate: Decimal,
    as_of: DateTime<Utc>,
}

/// Converts observed prices into the settlement currency.
///
/// Resolution order: in-memory cache (re-validated against the validity
/// window), then the store's most recent rate inside the window, then the
/// configured fallback table. `None` means no rate exists anywhere; callers
/// must exclude the observation, never substitute zero.
pub struct CurrencyNormalizer {
    store: Arc<dyn PriceStore>,
    settings: NormalizerSettings,
    cache: RwLock<HashMap<(String, String), CachedRate>>,
}

impl CurrencyNormalizer {
    pub fn new(store: Arc<dyn PriceStore>, settings: NormalizerSettings) -> Self {
        Self {
            store,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn settlement_currency(&self) -> &str {
        &self.settings.settlement_currency
    }

    pub fn convert(&self, amount: Decimal, from_currency: &str, to_currency: &str) -> Option<Decimal> {
        if from_currency == to_currency {
            return Some(amount);
        }

        if let Some(rate) = self.lookup_rate(from_currency, to_currency) {
            return Some(amount * rate);
        }

        let fallback_key = format!("{from_currency}:{to_currency}");
        if let Some(rate) = self.settings.fallback_rates.get(&fallback_key) {
            debug!("Using fallback rate for {fallback_key}: {rate}");
            return Some(amount * rate);
        }

        warn!("No exchange rate available for {from_currency} to {to_currency}");
        None
    }

    pub fn convert_to_settlement(&self, amount: Decimal, from_currency: &str) -> Option<Decimal> {
        let to = self.settings.settlement_currency.clone();
        self.convert(amount, from_currency, &to)
    }

    /// Records a fresh rate in the store and the cache.
    pub fn update_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        rate: Decimal,
    ) -> crate::store::StoreResult<()> {
        let now = Utc::now();
        self.store.put_rate(ExchangeRate {
            from_currency: from_currency.to_string(),
            to_currency: to_currency.to_string(),
            rate,
            timestamp: now,
        })?;

        self.cache.write().unwrap().insert(
            (from_currency.to_string(), to_currency.to_string()),
            CachedRate { rate, as_of: now },
        );
        Ok(())
    }

    fn lookup_rate(&self, from_currency: &str, to_currency: &str) -> Option<Decimal> {
        let key = (from_currency.to_string(), to_currency.to_string());
        let window_start = Utc::now() - self.settings.rate_validity;

        if let Some(cached) = self.cache.read().unwrap().get(&key) {
            if cached.as_of >= window_start {
                return Some(cached.rate);
            }
        }

        match self.store.latest_rate(from_currency, to_currency, window_start) {
            Ok(Some(stored)) => {
                self.cache.write().unwrap().insert(
                    key,
                    CachedRate {
                        rate: stored.rate,
                        as_of: stored.timestamp,
                    },
                );
                Some(stored.rate)
            }
            Ok(None) => None,
            Err(e) => {
                // Rate lookup failures degrade to the fallback table rather
                // than aborting the caller's pass.
                warn!("Rate lookup failed for {from_currency}->{to_currency}: {e}");
                None
            }
        }
    }
}
