//! Price direction prediction from a completed analysis

use crate::types::{PatternKind, PredictionRisk, PriceAnalysis, PricePrediction, TrendDirection};

/// Trend strength above which the regression alone decides the direction.
const STRONG_TREND: f64 = 0.7;

const DEFAULT_HOLD_HOURS: u32 = 24;

/// Composes trend and the latest reversal pattern into a directional call.
/// A strong trend wins outright; otherwise the most recent trough implies
/// a bounce up and the most recent peak a move down.
pub fn predict_direction(analysis: &PriceAnalysis) -> TrendDirection {
    if analysis.trend.strength > STRONG_TREND {
        return analysis.trend.direction;
    }

    match analysis.patterns.last().map(|p| p.kind) {
        Some(PatternKind::Trough) => TrendDirection::Up,
        Some(PatternKind::Peak) => TrendDirection::Down,
        None => TrendDirection::Neutral,
    }
}

pub fn predict(analysis: &PriceAnalysis) -> PricePrediction {
    let confidence = (analysis.trend.strength
        + (1.0 - analysis.volatility.volatility).max(0.0)
        + if analysis.seasonality.has_seasonality { 0.8 } else { 0.5 })
        / 3.0;

    let mut hold_hours = DEFAULT_HOLD_HOURS as f64;
    if analysis.volatility.volatility > 0.2 {
        hold_hours *= 0.5;
    } else if analysis.volatility.volatility < 0.05 {
        hold_hours *= 1.5;
    }
    if analysis.seasonality.has_seasonality {
        hold_hours = hold_hours.min(12.0);
    }

    let mut risk_factors = Vec::new();
    if analysis.volatility.volatility > 0.15 {
        risk_factors.push(PredictionRisk::HighVolatility);
    }
    if analysis.volatility.max_drawdown > 0.1 {
        risk_factors.push(PredictionRisk::LargeDrawdown);
    }
    if analysis.trend.strength < 0.3 {
        risk_factors.push(PredictionRisk::WeakTrend);
    }
    if analysis.seasonality.has_seasonality {
        risk_factors.push(PredictionRisk::SeasonalSwings);
    }

    PricePrediction {
        direction: predict_direction(analysis),
        confidence,
        suggested_hold_hours: hold_hours as u32,
        risk_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PricePattern, TrendAnalysis};

    fn analysis_with(trend: TrendAnalysis, patterns: Vec<PricePattern>) -> PriceAnalysis {
        PriceAnalysis {
            trend,
            patterns,
            ..PriceAnalysis::default()
        }
    }

    #[test]
    fn strong_trend_wins() {
        let analysis = analysis_with(
            TrendAnalysis {
                direction: TrendDirection::Down,
                strength: 0.9,
                slope: -0.5,
            },
            vec![PricePattern {
                kind: PatternKind::Trough,
                position: 5,
                value: 10.0,
            }],
        );
        assert_eq!(predict_direction(&analysis), TrendDirection::Down);
    }

    #[test]
    fn weak_trend_defers_to_latest_pattern() {
        let analysis = analysis_with(
            TrendAnalysis {
                direction: TrendDirection::Down,
                strength: 0.2,
                slope: -0.01,
            },
            vec![
                PricePattern {
                    kind: PatternKind::Peak,
                    position: 3,
                    value: 30.0,
                },
                PricePattern {
                    kind: PatternKind::Trough,
                    position: 8,
                    value: 12.0,
                },
            ],
        );
        assert_eq!(predict_direction(&analysis), TrendDirection::Up);
    }

    #[test]
    fn no_signal_is_neutral() {
        let analysis = PriceAnalysis::default();
        assert_eq!(predict_direction(&analysis), TrendDirection::Neutral);
    }

    #[test]
    fn volatile_history_shortens_hold_time() {
        let mut analysis = PriceAnalysis::default();
        analysis.volatility.volatility = 0.3;
        let prediction = predict(&analysis);
        assert_eq!(prediction.suggested_hold_hours, 12);
        assert!(prediction.risk_factors.contains(&PredictionRisk::HighVolatility));
    }
}
