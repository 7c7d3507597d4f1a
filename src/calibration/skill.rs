//! Per-source predictive skill
//!
//! Each accepted signal records what every source read. Once positions
//! resolve, the Pearson correlation between a source's readings and the
//! win/loss outcome (its information coefficient) says whether the source
//! knows anything; sources indistinguishable from noise lose their weight.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CalibrationConfig;
use crate::portfolio::Position;
use crate::signal::modifiers::{SCORED_SOURCES, WEIGHTED_SOURCES};
use crate::signal::SourceWeights;

/// Skill of one signal source over resolved positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSkill {
    pub source: String,
    pub samples: usize,
    /// `None` when a series has zero variance
    pub ic: Option<f64>,
    /// Fraction of resolved positions where the source leaned the right way
    pub hit_rate: Option<f64>,
    pub weight: Decimal,
    pub disabled: bool,
    /// Scored for the report but never weighted
    #[serde(default)]
    pub informational: bool,
}

/// Pearson correlation; `None` for fewer than 3 points or zero variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 3 {
        return None;
    }

    let nf = n as f64;
    let mean_x = xs[..n].iter().sum::<f64>() / nf;
    let mean_y = ys[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// Weight for an IC under the configured thresholds
///
/// Too few samples keep full weight; below the noise floor is zero; between
/// the noise floor and the full-weight IC the weight rises linearly.
pub fn weight_for(ic: Option<f64>, samples: usize, config: &CalibrationConfig) -> Decimal {
    if samples < config.min_skill_samples {
        return Decimal::ONE;
    }
    let Some(ic) = ic else {
        return Decimal::ZERO;
    };
    if ic < config.noise_ic {
        return Decimal::ZERO;
    }

    let span = config.full_weight_ic - config.noise_ic;
    let raw = if span <= 0.0 {
        1.0
    } else {
        ((ic - config.noise_ic) / span).clamp(0.0, 1.0)
    };
    Decimal::from_f64(raw).unwrap_or(Decimal::ONE).round_dp(4)
}

/// Score every known source and derive the weights the pipeline should use
pub fn score_sources(
    resolved: &[Position],
    config: &CalibrationConfig,
) -> (Vec<SourceSkill>, SourceWeights) {
    let mut series: BTreeMap<&str, (Vec<f64>, Vec<f64>)> = SCORED_SOURCES
        .iter()
        .map(|s| (*s, (Vec::new(), Vec::new())))
        .collect();

    for position in resolved {
        let Some(won) = position.won() else {
            continue;
        };
        let outcome = if won { 1.0 } else { 0.0 };
        for reading in &position.source_readings {
            let Some(value) = reading.value.to_f64() else {
                continue;
            };
            let entry = series
                .entry(reading.source.as_str())
                .or_insert_with(|| (Vec::new(), Vec::new()));
            entry.0.push(value);
            entry.1.push(outcome);
        }
    }

    let mut weights = SourceWeights::default();
    let skills = series
        .into_iter()
        .map(|(source, (xs, ys))| {
            let samples = xs.len();
            let ic = pearson(&xs, &ys);
            let informational = !WEIGHTED_SOURCES.contains(&source);
            let weight = if informational {
                Decimal::ONE
            } else {
                let weight = weight_for(ic, samples, config);
                weights.set(source, weight);
                weight
            };

            SourceSkill {
                source: source.to_string(),
                samples,
                ic,
                hit_rate: hit_rate(&xs, &ys),
                disabled: weight.is_zero(),
                weight,
                informational,
            }
        })
        .collect();

    (skills, weights)
}

/// Share of outcomes on the side of the median reading the source favored
fn hit_rate(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = sorted[sorted.len() / 2];

    let hits = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| (**x >= median) == (**y > 0.5))
        .count();
    Some(hits as f64 / xs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Settlement;
    use crate::portfolio::test_support::accepted_signal;
    use crate::portfolio::{CorrelationGroup, PortfolioLimits, PortfolioState};
    use crate::signal::SourceReading;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&xs, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_weight_thresholds() {
        let config = CalibrationConfig::default();
        assert_eq!(weight_for(Some(-0.3), 5, &config), dec!(1));
        assert_eq!(weight_for(Some(0.01), 100, &config), dec!(0));
        assert_eq!(weight_for(None, 100, &config), dec!(0));
        assert_eq!(weight_for(Some(0.125), 100, &config), dec!(0.5));
        assert_eq!(weight_for(Some(0.6), 100, &config), dec!(1));
    }

    fn resolved_with(readings: &[(f64, bool)]) -> Vec<Position> {
        let mut state = PortfolioState::new(dec!(1_000_000));
        let mut limits = PortfolioLimits::default();
        limits.default_group_cap = usize::MAX;
        limits.max_open_positions = usize::MAX;

        for (i, (value, won)) in readings.iter().enumerate() {
            let mut signal = accepted_signal(&format!("m{}", i), CorrelationGroup::Other, dec!(0.5), dec!(10));
            signal.source_readings = vec![
                SourceReading {
                    source: "momentum".to_string(),
                    value: Decimal::from_f64(*value).unwrap(),
                },
                SourceReading {
                    source: "volume_spike".to_string(),
                    value: Decimal::from(i as i64 % 2),
                },
            ];
            let id = state.open(&signal, &limits, Utc::now()).unwrap().id;
            let settlement = if *won { Settlement::Yes } else { Settlement::No };
            state.resolve(id, settlement, Utc::now()).unwrap();
        }
        state.resolved_positions
    }

    #[test]
    fn test_informative_source_keeps_weight() {
        let readings: Vec<(f64, bool)> = (0..40)
            .map(|i| if i % 2 == 0 { (0.05, true) } else { (-0.05, false) })
            .collect();
        let (skills, weights) = score_sources(&resolved_with(&readings), &CalibrationConfig::default());

        let momentum = skills.iter().find(|s| s.source == "momentum").unwrap();
        assert_eq!(momentum.samples, 40);
        assert!(momentum.ic.unwrap() > 0.99);
        assert_eq!(weights.get("momentum"), dec!(1));

        let empirical = skills.iter().find(|s| s.source == "empirical").unwrap();
        assert_eq!(empirical.samples, 0);
        assert_eq!(weights.get("empirical"), dec!(1));
    }

    #[test]
    fn test_noise_source_is_disabled() {
        // readings uncorrelated with outcomes
        let readings: Vec<(f64, bool)> = (0..40)
            .map(|i| (if i % 4 < 2 { 0.05 } else { -0.05 }, i % 2 == 0))
            .collect();
        let (skills, weights) = score_sources(&resolved_with(&readings), &CalibrationConfig::default());

        let momentum = skills.iter().find(|s| s.source == "momentum").unwrap();
        assert!(momentum.ic.unwrap().abs() < 0.05);
        assert!(momentum.disabled);
        assert!(weights.is_disabled("momentum"));
    }

    #[test]
    fn test_empirical_source_is_scored_but_never_disabled() {
        let readings: Vec<(f64, bool)> = (0..40).map(|i| (0.05, i % 2 == 0)).collect();
        let mut positions = resolved_with(&readings);
        for (i, position) in positions.iter_mut().enumerate() {
            position.source_readings.push(SourceReading {
                source: "empirical".to_string(),
                value: if i % 4 < 2 { dec!(0.80) } else { dec!(0.60) },
            });
        }
        let (skills, weights) = score_sources(&positions, &CalibrationConfig::default());

        let empirical = skills.iter().find(|s| s.source == "empirical").unwrap();
        assert_eq!(empirical.samples, 40);
        assert!(empirical.ic.unwrap().abs() < 0.05);
        assert!(empirical.informational);
        assert!(!empirical.disabled);
        assert!(weights.iter().all(|(source, _)| source != "empirical"));

        let momentum = skills.iter().find(|s| s.source == "momentum").unwrap();
        assert!(!momentum.informational);
        // constant readings carry no information
        assert!(momentum.disabled);
    }
}
