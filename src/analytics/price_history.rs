//! Descriptive statistics, trend, pattern and volatility analysis over a
//! product's price history

use chrono::{DateTime, Duration, Timelike, Utc};
use rust_decimal::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use crate::store::PriceStore;
use crate::types::{
    BasicStats, PatternKind, PriceAnalysis, PricePattern, ProductId, SeasonalityAnalysis,
    TrendAnalysis, TrendDirection, VolatilityAnalysis,
};

/// Minimum samples before reversal detection makes sense.
const PATTERN_MIN_POINTS: usize = 10;
/// Hour-of-day bucketing needs at least a day of data.
const SEASONALITY_MIN_POINTS: usize = 24;

pub struct PriceAnalytics {
    store: Arc<dyn PriceStore>,
}

impl PriceAnalytics {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Analyzes converted prices over the last `window_days`. Never fails:
    /// missing or unreadable history yields the all-zero analysis.
    pub fn analyze_history(&self, product_id: ProductId, window_days: i64) -> PriceAnalysis {
        let since = Utc::now() - Duration::days(window_days);
        let observations = match self.store.product_observations(product_id, since) {
            Ok(observations) => observations,
            Err(e) => {
                warn!("Price history unavailable for product {product_id}: {e}");
                return PriceAnalysis::default();
            }
        };

        let mut prices = Vec::with_capacity(observations.len());
        let mut timestamps = Vec::with_capacity(observations.len());
        for observation in &observations {
            if observation.is_unavailable() {
                continue;
            }
            if let Some(price) = observation.converted_price.to_f64() {
                prices.push(price);
                timestamps.push(observation.timestamp);
            }
        }

        if prices.is_empty() {
            return PriceAnalysis::default();
        }

        PriceAnalysis {
            basic_stats: basic_stats(&prices),
            trend: analyze_trend(&prices),
            patterns: detect_patterns(&prices),
            seasonality: analyze_seasonality(&prices, &timestamps),
            volatility: analyze_volatility(&prices),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub(crate) fn basic_stats(prices: &[f64]) -> BasicStats {
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let median = if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    };

    BasicStats {
        mean: mean(prices),
        median,
        std_dev: std_dev(prices),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        latest: prices[prices.len() - 1],
    }
}

/// Linear regression of price against observation index. Direction comes
/// from the slope sign, strength from |r|.
pub(crate) fn analyze_trend(prices: &[f64]) -> TrendAnalysis {
    if prices.len() < 2 {
        return TrendAnalysis::default();
    }

    let n = prices.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = mean(prices);

    let mut ss_xy = 0.0;
    let mut ss_xx = 0.0;
    let mut ss_yy = 0.0;
    for (i, &y) in prices.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        ss_xy += dx * dy;
        ss_xx += dx * dx;
        ss_yy += dy * dy;
    }

    let slope = ss_xy / ss_xx;
    let r = if ss_yy == 0.0 {
        0.0
    } else {
        ss_xy / (ss_xx * ss_yy).sqrt()
    };

    let direction = if slope > 0.0 {
        TrendDirection::Up
    } else if slope < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Neutral
    };

    TrendAnalysis {
        direction,
        strength: r.abs(),
        slope,
    }
}

/// Local reversal detection over a 5-point neighborhood: a point is a peak
/// (resp. trough) iff it strictly exceeds (resp. is exceeded by) all four
/// surrounding points.
pub(crate) fn detect_patterns(prices: &[f64]) -> Vec<PricePattern> {
    if prices.len() < PATTERN_MIN_POINTS {
        return Vec::new();
    }

    let mut patterns = Vec::new();
    for i in 2..prices.len() - 2 {
        let neighborhood = [prices[i - 2], prices[i - 1], prices[i + 1], prices[i + 2]];
        if neighborhood.iter().all(|&p| prices[i] > p) {
            patterns.push(PricePattern {
                kind: PatternKind::Peak,
                position: i,
                value: prices[i],
            });
        } else if neighborhood.iter().all(|&p| prices[i] < p) {
            patterns.push(PricePattern {
                kind: PatternKind::Trough,
                position: i,
                value: prices[i],
            });
        }
    }
    patterns
}

/// Buckets prices by hour of day and flags seasonality when the spread of
/// hourly averages exceeds 10% of the overall price spread.
pub(crate) fn analyze_seasonality(
    prices: &[f64],
    timestamps: &[DateTime<Utc>],
) -> SeasonalityAnalysis {
    if prices.len() < SEASONALITY_MIN_POINTS {
        return SeasonalityAnalysis::default();
    }

    let mut buckets: HashMap<u32, Vec<f64>> = HashMap::new();
    for (&price, timestamp) in prices.iter().zip(timestamps) {
        buckets.entry(timestamp.hour()).or_default().push(price);
    }

    let hourly_averages: HashMap<u32, f64> = buckets
        .into_iter()
        .map(|(hour, prices)| (hour, mean(&prices)))
        .collect();

    let averages: Vec<f64> = hourly_averages.values().copied().collect();
    let variation = std_dev(&averages);
    let has_seasonality = variation > std_dev(prices) * 0.1;

    SeasonalityAnalysis {
        has_seasonality,
        hourly_averages,
        variation,
    }
}

pub(crate) fn analyze_volatility(prices: &[f64]) -> VolatilityAnalysis {
    if prices.len() < 2 {
        return VolatilityAnalysis::default();
    }

    let returns: Vec<f64> = prices
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.is_empty() {
        return VolatilityAnalysis::default();
    }

    VolatilityAnalysis {
        volatility: std_dev(&returns),
        mean_abs_return: mean(&returns.iter().map(|r| r.abs()).collect::<Vec<_>>()),
        max_drawdown: max_drawdown(prices),
    }
}

/// Largest fractional drop from any prior peak to a later point.
pub(crate) fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = prices[0];
    let mut max_drawdown = 0.0_f64;

    for &price in &prices[1..] {
        if price > peak {
            peak = price;
        }
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - price) / peak);
        }
    }
    max_drawdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::PriceObservation;
    use rust_decimal_macros::dec;

    #[test]
    fn basic_stats_on_known_series() {
        let stats = basic_stats(&[10.0, 20.0, 30.0, 40.0]);
        assert!((stats.mean - 25.0).abs() < 1e-9);
        assert!((stats.median - 25.0).abs() < 1e-9);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.max, 40.0);
        assert_eq!(stats.latest, 40.0);
        // population std dev of [10,20,30,40]
        assert!((stats.std_dev - 125.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn trend_detects_direction_and_strength() {
        let up = analyze_trend(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(up.direction, TrendDirection::Up);
        assert!((up.strength - 1.0).abs() < 1e-9);

        let down = analyze_trend(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(down.direction, TrendDirection::Down);
        assert!((down.strength - 1.0).abs() < 1e-9);

        let flat = analyze_trend(&[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(flat.strength, 0.0);
    }

    #[test]
    fn patterns_need_five_point_dominance() {
        // Peak at index 4 (50 above all four neighbors), trough at index 7
        let prices = [10.0, 11.0, 12.0, 13.0, 50.0, 13.0, 12.0, 5.0, 12.0, 13.0];
        let patterns = detect_patterns(&prices);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].kind, PatternKind::Peak);
        assert_eq!(patterns[0].position, 4);
        assert_eq!(patterns[1].kind, PatternKind::Trough);
        assert_eq!(patterns[1].position, 7);
    }

    #[test]
    fn short_series_has_no_patterns() {
        let prices = [1.0, 9.0, 1.0, 9.0, 1.0];
        assert!(detect_patterns(&prices).is_empty());
    }

    #[test]
    fn seasonality_flags_hourly_swings() {
        let base = Utc::now() - Duration::days(2);
        let mut prices = Vec::new();
        let mut timestamps = Vec::new();
        for i in 0..48 {
            let ts = base + Duration::hours(i);
            // Night hours sell noticeably cheaper
            let price = if ts.hour() < 8 { 10.0 } else { 20.0 };
            prices.push(price);
            timestamps.push(ts);
        }

        let seasonality = analyze_seasonality(&prices, &timestamps);
        assert!(seasonality.has_seasonality);
        assert_eq!(seasonality.hourly_averages.len(), 24);
    }

    #[test]
    fn seasonality_requires_a_day_of_data() {
        let base = Utc::now();
        let prices: Vec<f64> = (0..10).map(|i| 10.0 + i as f64).collect();
        let timestamps: Vec<_> = (0..10).map(|i| base + Duration::hours(i)).collect();
        assert!(!analyze_seasonality(&prices, &timestamps).has_seasonality);
    }

    #[test]
    fn max_drawdown_from_running_peak() {
        // Peak 100, lowest afterwards 60 -> 40% drawdown
        let prices = [80.0, 100.0, 90.0, 60.0, 75.0];
        assert!((max_drawdown(&prices) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn empty_history_yields_zeroed_analysis() {
        let store = Arc::new(MemoryStore::new());
        let analytics = PriceAnalytics::new(store);
        let analysis = analytics.analyze_history(1, 30);

        assert_eq!(analysis.basic_stats.mean, 0.0);
        assert_eq!(analysis.trend.direction, TrendDirection::Neutral);
        assert!(analysis.patterns.is_empty());
        assert!(!analysis.seasonality.has_seasonality);
        assert_eq!(analysis.volatility.volatility, 0.0);
    }

    #[test]
    fn analyze_history_skips_unavailable_observations() {
        let store = Arc::new(MemoryStore::new());
        for (id, price) in [(1, dec!(10)), (2, dec!(-1)), (3, dec!(20))] {
            store
                .insert_observation(PriceObservation {
                    id,
                    product_id: 1,
                    marketplace_id: 1,
                    price,
                    currency: "EUR".to_string(),
                    converted_price: price,
                    region: "EU".to_string(),
                    url: None,
                    in_stock: true,
                    is_sale: false,
                    timestamp: Utc::now() - Duration::hours(3 - id),
                })
                .unwrap();
        }

        let analytics = PriceAnalytics::new(store);
        let analysis = analytics.analyze_history(1, 30);
        assert_eq!(analysis.basic_stats.min, 10.0);
        assert_eq!(analysis.basic_stats.latest, 20.0);
    }
}
