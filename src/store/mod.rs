//! Persistence collaborator interface
//!
//! The pipeline never talks to a storage engine directly; it depends on the
//! `PriceStore` trait. The bundled `MemoryStore` backs the binary and tests.

pub mod ingest;
pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use thiserror::Error;
use crate::types::{
    ArbitrageOpportunity, ExchangeRate, Marketplace, MarketplaceId, NotificationRecord,
    ObservationId, OpportunityStatus, PriceObservation, Product, ProductId,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown {entity} id {id}")]
    MissingEntity { entity: &'static str, id: i64 },

    #[error("unknown opportunity {0}")]
    MissingOpportunity(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait PriceStore: Send + Sync {
    /// All observations recorded at or after `since`, any product.
    fn recent_observations(&self, since: DateTime<Utc>) -> StoreResult<Vec<PriceObservation>>;

    /// Observations for one logical product since `since`, ascending by
    /// timestamp. Includes observations recorded under superseded catalog
    /// ids that resolve to the same product.
    fn product_observations(
        &self,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceObservation>>;

    fn observation(&self, id: ObservationId) -> StoreResult<Option<PriceObservation>>;

    /// Appends an observation. An id of zero is replaced with a fresh one;
    /// re-inserting an existing id is a no-op (ingest is replay-safe).
    fn insert_observation(&self, observation: PriceObservation) -> StoreResult<ObservationId>;

    fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Follows `replaced_by` links to the current catalog id. Unknown ids
    /// resolve to themselves.
    fn resolve_product(&self, id: ProductId) -> StoreResult<ProductId>;

    fn marketplace(&self, id: MarketplaceId) -> StoreResult<Option<Marketplace>>;

    /// Most recent rate for the pair recorded at or after `since`.
    fn latest_rate(
        &self,
        from_currency: &str,
        to_currency: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<ExchangeRate>>;

    fn rate_history(
        &self,
        from_currency: &str,
        to_currency: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<ExchangeRate>>;

    fn put_rate(&self, rate: ExchangeRate) -> StoreResult<()>;

    fn insert_opportunity(&self, opportunity: ArbitrageOpportunity) -> StoreResult<()>;

    fn active_opportunities(&self) -> StoreResult<Vec<ArbitrageOpportunity>>;

    fn opportunity(&self, id: &str) -> StoreResult<Option<ArbitrageOpportunity>>;

    fn update_opportunity_status(&self, id: &str, status: OpportunityStatus) -> StoreResult<()>;

    fn record_notification(&self, record: NotificationRecord) -> StoreResult<()>;
}
