//! Pipeline configuration settings and environment variable handling

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

// Opportunity acceptance thresholds
pub const DEFAULT_MIN_PROFIT_MARGIN: Decimal = dec!(10.0); // percent
pub const DEFAULT_MIN_ABSOLUTE_PROFIT: Decimal = dec!(5.0); // settlement currency
pub const DEFAULT_MAX_INVESTMENT: Decimal = dec!(1000.0);
pub const DEFAULT_MAX_HOLD_TIME_HOURS: i64 = 72;

// Windows
pub const DEFAULT_OBSERVATION_WINDOW_SECS: i64 = 3_600;
pub const DEFAULT_RATE_VALIDITY_SECS: i64 = 3_600;
pub const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_DETECTION_INTERVAL_SECS: u64 = 300;

// Free-to-play / invalid product filter
pub const FREE_PRICE_THRESHOLD: Decimal = dec!(1.0);
pub const DEFAULT_TRUSTED_MARKETPLACES: &str = "steam,epic games,origin";

pub const DEFAULT_SETTLEMENT_CURRENCY: &str = "EUR";
pub const SUPPORTED_CURRENCIES: [&str; 5] = ["USD", "EUR", "GBP", "AUD", "CAD"];

#[derive(Debug, Clone)]
pub struct Config {
    pub settlement_currency: String,
    pub min_profit_margin: Decimal,
    pub min_absolute_profit: Decimal,
    pub max_investment: Decimal,
    pub max_hold_time_hours: i64,
    pub observation_window_secs: i64,
    pub rate_validity_secs: i64,
    pub history_window_days: i64,
    pub detection_interval_secs: u64,
    /// Hard-coded rates of last resort, keyed "FROM:TO". Data-driven so a
    /// deployment can pin or clear them without touching code.
    pub fallback_rates: HashMap<String, Decimal>,
    pub trusted_marketplaces: Vec<String>,
    pub free_price_threshold: Decimal,
    pub data_dir: PathBuf,
    // Circuit breaker
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
    // Notification channels
    pub telegram_enabled: bool,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_enabled: bool,
    pub discord_webhook_url: Option<String>,
    pub webhook_enabled: bool,
    pub webhook_url: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            settlement_currency: env::var("SETTLEMENT_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_SETTLEMENT_CURRENCY.to_string()),
            min_profit_margin: env::var("MIN_PROFIT_MARGIN")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(DEFAULT_MIN_PROFIT_MARGIN),
            min_absolute_profit: env::var("MIN_ABSOLUTE_PROFIT")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(DEFAULT_MIN_ABSOLUTE_PROFIT),
            max_investment: env::var("MAX_INVESTMENT")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(DEFAULT_MAX_INVESTMENT),
            max_hold_time_hours: env::var("MAX_HOLD_TIME_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_HOLD_TIME_HOURS)
                .max(1),
            observation_window_secs: env::var("OBSERVATION_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_OBSERVATION_WINDOW_SECS)
                .max(60),
            rate_validity_secs: env::var("RATE_VALIDITY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_VALIDITY_SECS)
                .max(60),
            history_window_days: env::var("HISTORY_WINDOW_DAYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_WINDOW_DAYS)
                .max(1),
            detection_interval_secs: env::var("DETECTION_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DETECTION_INTERVAL_SECS)
                .max(10),
            fallback_rates: env::var("FALLBACK_RATES")
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_else(default_fallback_rates),
            trusted_marketplaces: env::var("TRUSTED_MARKETPLACES")
                .unwrap_or_else(|_| DEFAULT_TRUSTED_MARKETPLACES.to_string())
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            free_price_threshold: env::var("FREE_PRICE_THRESHOLD")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(FREE_PRICE_THRESHOLD),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            max_consecutive_errors: env::var("MAX_CONSECUTIVE_ERRORS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            circuit_breaker_cooldown_secs: env::var("CIRCUIT_BREAKER_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            telegram_enabled: env_flag("TELEGRAM_ENABLED", false),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            discord_enabled: env_flag("DISCORD_ENABLED", false),
            discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").ok(),
            webhook_enabled: env_flag("WEBHOOK_ENABLED", false),
            webhook_url: env::var("WEBHOOK_URL").ok(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// USD/EUR rates of last resort when the store has no recent rate. These
/// exist so a cold start with an empty rate feed still produces results;
/// production deployments should pin `FALLBACK_RATES` or supply a feed.
pub fn default_fallback_rates() -> HashMap<String, Decimal> {
    HashMap::from([
        ("USD:EUR".to_string(), dec!(0.93)),
        ("EUR:USD".to_string(), dec!(1.08)),
    ])
}
