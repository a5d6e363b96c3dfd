//! Market Arbitrage Bot - Main Entry Point
//!
//! Periodic detection loop over collaborator-produced price feeds

use market_arb_bot::*;
use anyhow::Result;
use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{debug, error, info, warn};
use market_arb_bot::arbitrage::{MatcherSettings, OpportunityLifecycle, OpportunityMatcher};
use market_arb_bot::classify::{ClassifierSettings, ProductClassifier};
use market_arb_bot::currency::NormalizerSettings;
use market_arb_bot::notify::NotificationDispatcher;
use market_arb_bot::store::{ingest, MemoryStore, PriceStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;
    utils::setup_output_directories()?;

    // Load configuration
    let config = CONFIG.clone();

    info!("🕹️  Market Arbitrage Bot v0.5.0 - Cross-Marketplace Detection");
    info!("📋 Configuration:");
    info!("   Settlement Currency: {}", config.settlement_currency);
    info!("   Min Profit Margin: {}%", config.min_profit_margin);
    info!("   Min Absolute Profit: {}", config.min_absolute_profit);
    info!("   Max Investment: {}", config.max_investment);
    info!("   Max Hold Time: {}h", config.max_hold_time_hours);
    info!("   Detection Interval: {}s", config.detection_interval_secs);
    info!("   Data Directory: {}", config.data_dir.display());

    // Validate configuration
    if !config::SUPPORTED_CURRENCIES.contains(&config.settlement_currency.as_str()) {
        return Err(anyhow::anyhow!(
            "Unsupported settlement currency: {}",
            config.settlement_currency
        ));
    }
    if config.min_profit_margin < Decimal::ZERO {
        return Err(anyhow::anyhow!(
            "Minimum profit margin must not be negative: {}",
            config.min_profit_margin
        ));
    }

    // Initialize components
    let store = Arc::new(MemoryStore::new());
    let catalog_path = config.data_dir.join("catalog.json");
    let (marketplaces, products) = ingest::load_catalog(&store, &catalog_path)?;
    if marketplaces == 0 {
        return Err(anyhow::anyhow!(
            "Catalog {} contains no marketplaces",
            catalog_path.display()
        ));
    }
    info!("✅ Catalog loaded: {} marketplaces, {} products", marketplaces, products);

    let price_store: Arc<dyn PriceStore> = store.clone();
    let classifier = Arc::new(ProductClassifier::new(
        price_store.clone(),
        ClassifierSettings {
            trusted_marketplaces: config.trusted_marketplaces.clone(),
            free_price_threshold: config.free_price_threshold,
            lookback: ChronoDuration::hours(24),
        },
    ));
    let matcher = OpportunityMatcher::new(
        price_store.clone(),
        classifier.clone(),
        NormalizerSettings {
            settlement_currency: config.settlement_currency.clone(),
            rate_validity: ChronoDuration::seconds(config.rate_validity_secs),
            fallback_rates: config.fallback_rates.clone(),
        },
        MatcherSettings {
            min_profit_margin: config.min_profit_margin,
            min_absolute_profit: config.min_absolute_profit,
            max_investment: config.max_investment,
            max_hold_time: ChronoDuration::hours(config.max_hold_time_hours),
            observation_window: ChronoDuration::seconds(config.observation_window_secs),
        },
    );
    let lifecycle = OpportunityLifecycle::new(price_store.clone(), classifier);
    let analytics = analytics::PriceAnalytics::new(price_store.clone());
    let dispatcher = NotificationDispatcher::from_config(price_store.clone(), &config);
    let circuit_breaker = Arc::new(errors::CircuitBreaker::new(
        config.max_consecutive_errors,
        config.circuit_breaker_cooldown_secs,
    ));

    if dispatcher.channel_count() == 0 {
        info!("📣 No notification channels configured, alerts are log-only");
    }

    // Setup monitoring state
    let start_time = Instant::now();
    let mut state = MonitoringState::new();

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let shutdown_tx = Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx)));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Failed to listen for Ctrl+C");
            return;
        }
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        if let Some(tx) = shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    info!("\n🚀 Starting detection loop...\n");

    let mut interval = time::interval(Duration::from_secs(config.detection_interval_secs));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = run_detection_pass(
                    &store,
                    &price_store,
                    &matcher,
                    &lifecycle,
                    &analytics,
                    &dispatcher,
                    &config,
                    &circuit_breaker,
                    &mut state,
                    start_time,
                ).await {
                    error!("Detection pass error: {}", e);
                    if circuit_breaker.record_error().await {
                        error!("Circuit breaker activated due to detection errors");
                    }
                }
            }
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, exiting main loop...");
                break;
            }
        }
    }

    print_final_statistics(start_time, &state);

    Ok(())
}

/// Monitoring state to track statistics
struct MonitoringState {
    total_passes: u64,
    total_opportunities: u64,
    total_potential_profit: Decimal,
    expired_opportunities: u64,
    notifications_delivered: u64,
    error_counts: HashMap<String, u32>,
}

impl MonitoringState {
    fn new() -> Self {
        Self {
            total_passes: 0,
            total_opportunities: 0,
            total_potential_profit: rust_decimal_macros::dec!(0),
            expired_opportunities: 0,
            notifications_delivered: 0,
            error_counts: HashMap::new(),
        }
    }
}

/// Run a single detection pass
#[allow(clippy::too_many_arguments)]
async fn run_detection_pass(
    store: &Arc<MemoryStore>,
    price_store: &Arc<dyn PriceStore>,
    matcher: &OpportunityMatcher,
    lifecycle: &OpportunityLifecycle,
    analytics: &analytics::PriceAnalytics,
    dispatcher: &NotificationDispatcher,
    config: &Config,
    circuit_breaker: &Arc<errors::CircuitBreaker>,
    state: &mut MonitoringState,
    start_time: Instant,
) -> Result<()> {
    // Check circuit breaker
    if !circuit_breaker.can_proceed().await {
        warn!("⚡ Circuit breaker is OPEN, waiting for cooldown...");
        return Ok(());
    }

    state.total_passes += 1;

    // Replay collaborator feeds; idempotent by observation id
    reload_feeds(store, config, state);

    // Retire opportunities that are past expiry or on excluded products
    match lifecycle.expire_stale() {
        Ok(count) => state.expired_opportunities += count as u64,
        Err(e) => {
            warn!("Stale expiry failed: {e}");
            *state.error_counts.entry("expire_stale".to_string()).or_insert(0) += 1;
        }
    }
    match lifecycle.cleanup_excluded_products() {
        Ok(count) => state.expired_opportunities += count as u64,
        Err(e) => {
            warn!("Excluded product cleanup failed: {e}");
            *state.error_counts.entry("cleanup_excluded".to_string()).or_insert(0) += 1;
        }
    }

    let opportunities = matcher.find_opportunities()?;
    circuit_breaker.record_success().await;

    for opportunity in opportunities {
        state.total_opportunities += 1;
        state.total_potential_profit += opportunity.absolute_profit;

        if let Err(e) = price_store.insert_opportunity(opportunity.clone()) {
            error!("Failed to store opportunity {}: {}", opportunity.id, e);
            *state.error_counts.entry("store_opportunity".to_string()).or_insert(0) += 1;
            continue;
        }

        let snapshot = match storage::snapshot(price_store, &opportunity) {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                error!("Failed to build snapshot for {}: {}", opportunity.id, e);
                *state.error_counts.entry("snapshot".to_string()).or_insert(0) += 1;
                continue;
            }
        };

        utils::print_opportunity(&snapshot);

        let analysis = analytics.analyze_history(opportunity.product_id, config.history_window_days);
        let prediction = analytics::predict(&analysis);
        info!(
            "🔮 {}: trend {:?} (strength {:.2}), predicted {:?}, confidence {:.2}, hold ≤{}h",
            snapshot.product_name,
            analysis.trend.direction,
            analysis.trend.strength,
            prediction.direction,
            prediction.confidence,
            prediction.suggested_hold_hours,
        );

        if let Err(e) = storage::save_opportunity(&snapshot) {
            error!("Failed to save opportunity {}: {}", snapshot.id, e);
            *state.error_counts.entry("save_opportunity".to_string()).or_insert(0) += 1;
        }

        state.notifications_delivered += dispatcher.dispatch(&snapshot).await as u64;
    }

    // Print periodic statistics
    if state.total_passes % 12 == 0 {
        utils::print_session_stats(
            start_time,
            state.total_passes,
            state.total_opportunities,
            state.total_potential_profit,
            state.expired_opportunities,
            state.notifications_delivered,
            &state.error_counts,
            circuit_breaker,
        )
        .await;
    }

    Ok(())
}

/// Replay the observation and rate feeds. Missing feed files are normal
/// between collaborator runs; anything else is counted as an error.
fn reload_feeds(store: &Arc<MemoryStore>, config: &Config, state: &mut MonitoringState) {
    let observations_path = config.data_dir.join("observations.jsonl");
    if observations_path.exists() {
        match ingest::load_observations(store, &observations_path) {
            Ok(accepted) => debug!("Replayed {accepted} observations"),
            Err(e) => {
                warn!("Observation feed replay failed: {e}");
                *state.error_counts.entry("ingest_observations".to_string()).or_insert(0) += 1;
            }
        }
    }

    let rates_path = config.data_dir.join("rates.jsonl");
    if rates_path.exists() {
        match ingest::load_rates(store, &rates_path) {
            Ok(accepted) => debug!("Replayed {accepted} exchange rates"),
            Err(e) => {
                warn!("Rate feed replay failed: {e}");
                *state.error_counts.entry("ingest_rates".to_string()).or_insert(0) += 1;
            }
        }
    }
}

/// Print final statistics on shutdown
fn print_final_statistics(start_time: Instant, state: &MonitoringState) {
    info!("\n🛑 Shutting down gracefully...");
    info!("Final statistics:");
    info!("   Total runtime: {:?}", start_time.elapsed());
    info!("   Detection passes: {}", state.total_passes);
    info!("   Opportunities found: {}", state.total_opportunities);
    info!("   Total potential profit: {:.2}", state.total_potential_profit);
    info!("   Opportunities expired: {}", state.expired_opportunities);
    info!("   Notifications delivered: {}", state.notifications_delivered);
    info!("   Total errors: {:?}", state.error_counts);
}
