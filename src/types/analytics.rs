//! Price history analysis types

use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BasicStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub latest: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Magnitude of the correlation coefficient, [0, 1]
    pub strength: f64,
    pub slope: f64,
}

impl Default for TrendAnalysis {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Neutral,
            strength: 0.0,
            slope: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Peak,
    Trough,
}

/// A local price reversal: a point strictly above (peak) or below (trough)
/// its two neighbors on each side.
#[derive(Debug, Clone, Serialize)]
pub struct PricePattern {
    pub kind: PatternKind,
    pub position: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SeasonalityAnalysis {
    pub has_seasonality: bool,
    pub hourly_averages: HashMap<u32, f64>,
    pub variation: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VolatilityAnalysis {
    /// Standard deviation of period-over-period returns
    pub volatility: f64,
    pub mean_abs_return: f64,
    /// Largest drop from any prior peak, as a fraction of that peak
    pub max_drawdown: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PriceAnalysis {
    pub basic_stats: BasicStats,
    pub trend: TrendAnalysis,
    pub patterns: Vec<PricePattern>,
    pub seasonality: SeasonalityAnalysis,
    pub volatility: VolatilityAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionRisk {
    HighVolatility,
    LargeDrawdown,
    WeakTrend,
    SeasonalSwings,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricePrediction {
    pub direction: TrendDirection,
    pub confidence: f64,
    pub suggested_hold_hours: u32,
    pub risk_factors: Vec<PredictionRisk>,
}
