//! Display and printing utilities

use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};
use crate::errors::CircuitBreaker;
use crate::types::OpportunitySnapshot;

pub fn print_opportunity(snapshot: &OpportunitySnapshot) {
    warn!("\n🎯 ARBITRAGE OPPORTUNITY {}", snapshot.id);
    warn!("📦 Product: {}", snapshot.product_name);
    warn!("💰 Profit Analysis:");
    warn!(
        "   Buy:  {} @ {} {}",
        snapshot.source_marketplace, snapshot.source_price.amount, snapshot.source_price.currency
    );
    warn!(
        "   Sell: {} @ {} {}",
        snapshot.target_marketplace, snapshot.target_price.amount, snapshot.target_price.currency
    );
    warn!("   Gross Profit: {:.2}", snapshot.fee_breakdown.gross_profit);
    warn!("   Total Fees:   {:.2}", snapshot.fee_breakdown.total_fees);
    warn!("   Net Profit:   {:.2}", snapshot.absolute_profit);
    warn!("   Margin: {:.2}%", snapshot.profit_margin);
    warn!("⚠️  Risk Score: {:.2}", snapshot.risk_score);
    warn!("⏳ Expires: {}", snapshot.expires_at.format("%Y-%m-%d %H:%M UTC"));
}

#[allow(clippy::too_many_arguments)]
pub async fn print_session_stats(
    start_time: Instant,
    total_passes: u64,
    total_opportunities: u64,
    total_potential_profit: rust_decimal::Decimal,
    expired_opportunities: u64,
    notifications_delivered: u64,
    error_counts: &HashMap<String, u32>,
    circuit_breaker: &CircuitBreaker,
) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    info!("   📈 DETECTION:");
    info!("     Passes completed: {}", total_passes);
    info!("     Opportunities found: {}", total_opportunities);
    info!("     Opportunities per pass: {:.2}",
        if total_passes > 0 {
            total_opportunities as f64 / total_passes as f64
        } else {
            0.0
        }
    );
    info!("     Total potential profit: {:.2}", total_potential_profit);

    info!("   ♻️  LIFECYCLE:");
    info!("     Opportunities expired: {}", expired_opportunities);

    info!("   📣 NOTIFICATIONS:");
    info!("     Delivered: {}", notifications_delivered);

    info!("   ⚙️  SYSTEM:");
    info!("     Circuit breaker: {}",
        if *circuit_breaker.is_open.read().await { "OPEN" } else { "CLOSED" }
    );

    if !error_counts.is_empty() {
        info!("     Error summary:");
        for (error_type, count) in error_counts.iter() {
            info!("       {}: {}", error_type, count);
        }
    }

    info!("");
}
