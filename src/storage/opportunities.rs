//! Opportunity snapshot assembly and JSONL persistence

use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;
use tracing::info;
use crate::errors::{PipelineError, PipelineResult};
use crate::store::PriceStore;
use crate::types::{ArbitrageOpportunity, OpportunitySnapshot, PriceObservation, PriceTag};

/// Resolves an opportunity's references into the flattened view used by
/// the dashboard feed and notifications. A missing referenced entity is a
/// data integrity failure, not a skippable condition.
pub fn snapshot(
    store: &Arc<dyn PriceStore>,
    opportunity: &ArbitrageOpportunity,
) -> PipelineResult<OpportunitySnapshot> {
    let buy = observation(store, opportunity.buy_observation_id)?;
    let sell = observation(store, opportunity.sell_observation_id)?;

    let product_name = store
        .product(opportunity.product_id)?
        .map(|p| p.name)
        .ok_or_else(|| PipelineError::DanglingReference {
            id: opportunity.product_id,
            context: format!("product of opportunity {}", opportunity.id),
        })?;

    Ok(OpportunitySnapshot {
        id: opportunity.id.clone(),
        product_name,
        profit_margin: opportunity.profit_margin,
        absolute_profit: opportunity.absolute_profit,
        risk_score: opportunity.risk_score,
        source_marketplace: marketplace_name(store, &buy, &opportunity.id)?,
        target_marketplace: marketplace_name(store, &sell, &opportunity.id)?,
        source_price: PriceTag {
            amount: buy.price,
            currency: buy.currency,
        },
        target_price: PriceTag {
            amount: sell.price,
            currency: sell.currency,
        },
        detected_at: opportunity.detected_at,
        expires_at: opportunity.expires_at,
        fee_breakdown: opportunity.profit.clone(),
    })
}

fn observation(
    store: &Arc<dyn PriceStore>,
    id: i64,
) -> PipelineResult<PriceObservation> {
    store
        .observation(id)?
        .ok_or_else(|| PipelineError::DanglingReference {
            id,
            context: "observation".to_string(),
        })
}

fn marketplace_name(
    store: &Arc<dyn PriceStore>,
    observation: &PriceObservation,
    opportunity_id: &str,
) -> PipelineResult<String> {
    store
        .marketplace(observation.marketplace_id)?
        .map(|m| m.name)
        .ok_or_else(|| PipelineError::DanglingReference {
            id: observation.marketplace_id,
            context: format!("marketplace of opportunity {opportunity_id}"),
        })
}

/// Appends the snapshot to the daily JSONL feed under
/// `output/opportunities/`.
pub fn save_opportunity(snapshot: &OpportunitySnapshot) -> Result<()> {
    let filename = format!(
        "output/opportunities/arbitrage_{}.jsonl",
        Utc::now().format("%Y-%m-%d")
    );

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(snapshot)?)?;

    info!(
        opportunity_id = %snapshot.id,
        profit = %snapshot.absolute_profit,
        margin = %snapshot.profit_margin,
        "Saved arbitrage opportunity"
    );

    Ok(())
}
