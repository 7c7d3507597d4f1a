//! Calibration curve: predicted confidence decile against observed win rate

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::portfolio::Position;

/// One predicted-confidence decile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Inclusive lower bound of predicted confidence
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_win_rate: f64,
}

impl CalibrationBucket {
    /// Positive when predictions ran ahead of outcomes
    pub fn overconfidence(&self) -> f64 {
        self.mean_predicted - self.observed_win_rate
    }
}

/// Deciles plus summary scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    /// Non-empty deciles, lowest first
    pub buckets: Vec<CalibrationBucket>,
    pub samples: usize,
    /// Mean squared error of predicted confidence against the 0/1 outcome
    pub brier_score: Option<f64>,
    /// Mean predicted minus mean observed; positive means overconfident
    pub mean_overconfidence: Option<f64>,
}

/// Build the curve from resolved wins and losses
pub fn build_curve(resolved: &[Position]) -> CalibrationCurve {
    let points: Vec<(f64, f64)> = resolved
        .iter()
        .filter_map(|p| {
            let won = p.won()?;
            let predicted = p.predicted_confidence.to_f64()?.clamp(0.0, 1.0);
            Some((predicted, if won { 1.0 } else { 0.0 }))
        })
        .collect();

    if points.is_empty() {
        return CalibrationCurve::default();
    }

    let mut deciles: Vec<Vec<(f64, f64)>> = vec![Vec::new(); 10];
    for &(predicted, outcome) in &points {
        let index = ((predicted * 10.0) as usize).min(9);
        deciles[index].push((predicted, outcome));
    }

    let buckets = deciles
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_empty())
        .map(|(i, d)| {
            let count = d.len();
            let n = count as f64;
            CalibrationBucket {
                lower: i as f64 / 10.0,
                upper: (i + 1) as f64 / 10.0,
                count,
                mean_predicted: d.iter().map(|(p, _)| p).sum::<f64>() / n,
                observed_win_rate: d.iter().map(|(_, o)| o).sum::<f64>() / n,
            }
        })
        .collect();

    let n = points.len() as f64;
    let brier = points.iter().map(|(p, o)| (p - o).powi(2)).sum::<f64>() / n;
    let mean_predicted = points.iter().map(|(p, _)| p).sum::<f64>() / n;
    let mean_observed = points.iter().map(|(_, o)| o).sum::<f64>() / n;

    CalibrationCurve {
        buckets,
        samples: points.len(),
        brier_score: Some(brier),
        mean_overconfidence: Some(mean_predicted - mean_observed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Settlement;
    use crate::portfolio::test_support::accepted_signal;
    use crate::portfolio::{CorrelationGroup, PortfolioLimits, PortfolioState};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn resolved(outcomes: &[(Decimal, bool)]) -> Vec<Position> {
        let mut state = PortfolioState::new(dec!(100000));
        let mut limits = PortfolioLimits::default();
        limits.default_group_cap = usize::MAX;
        limits.max_open_positions = usize::MAX;

        for (i, (confidence, won)) in outcomes.iter().enumerate() {
            let mut signal = accepted_signal(&format!("m{}", i), CorrelationGroup::Other, dec!(0.5), dec!(10));
            signal.base_confidence = *confidence;
            let id = state.open(&signal, &limits, Utc::now()).unwrap().id;
            let settlement = if *won { Settlement::Yes } else { Settlement::No };
            state.resolve(id, settlement, Utc::now()).unwrap();
        }
        state.resolved_positions
    }

    #[test]
    fn test_empty_curve() {
        let curve = build_curve(&[]);
        assert!(curve.buckets.is_empty());
        assert_eq!(curve.brier_score, None);
    }

    #[test]
    fn test_deciles_and_brier() {
        let positions = resolved(&[
            (dec!(0.72), true),
            (dec!(0.74), true),
            (dec!(0.76), false),
            (dec!(0.78), true),
            (dec!(0.91), true),
        ]);
        let curve = build_curve(&positions);

        assert_eq!(curve.samples, 5);
        assert_eq!(curve.buckets.len(), 2);
        let seventies = &curve.buckets[0];
        assert_eq!(seventies.count, 4);
        assert!((seventies.mean_predicted - 0.75).abs() < 1e-9);
        assert!((seventies.observed_win_rate - 0.75).abs() < 1e-9);
        assert!(seventies.overconfidence().abs() < 1e-9);

        // (0.28² + 0.26² + 0.76² + 0.22² + 0.09²) / 5
        let expected = (0.0784 + 0.0676 + 0.5776 + 0.0484 + 0.0081) / 5.0;
        assert!((curve.brier_score.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_overconfidence_sign() {
        let positions = resolved(&[(dec!(0.9), false), (dec!(0.9), false), (dec!(0.9), true)]);
        let curve = build_curve(&positions);
        assert!(curve.mean_overconfidence.unwrap() > 0.5);
    }
}
