//! Bootstrap uncertainty haircut
//!
//! A bucket's smoothed rate rests on `w + n` effective outcomes. Resampling
//! that many Bernoulli draws at the smoothed rate shows how much the Kelly
//! fraction would move if the rate were estimated again; sizing uses a lower
//! percentile of those fractions instead of the point estimate.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::kelly::KellyCalculator;
use crate::config::SizingConfig;
use crate::confidence::ConfidenceScore;

/// Seeded parametric bootstrap over a bucket's effective outcomes
#[derive(Debug, Clone)]
pub struct UncertaintyHaircut {
    pub iterations: usize,
    /// Percentile of resampled fractions, 0-100
    pub percentile: u8,
    pub max_outcomes: u64,
    pub seed: u64,
}

impl UncertaintyHaircut {
    pub fn new(iterations: usize, percentile: u8, max_outcomes: u64, seed: u64) -> Self {
        Self {
            iterations,
            percentile: percentile.min(100),
            max_outcomes: max_outcomes.max(1),
            seed,
        }
    }

    pub fn from_config(config: &SizingConfig) -> Self {
        Self::new(
            config.bootstrap_iterations,
            config.bootstrap_percentile,
            config.bootstrap_max_outcomes,
            config.bootstrap_seed,
        )
    }

    /// Multiplier in [0, 1] applied to the point Kelly fraction
    pub fn factor(&self, score: &ConfidenceScore, entry_price: Decimal) -> Decimal {
        let point = KellyCalculator::full_fraction(score.confidence, entry_price);
        if point <= Decimal::ZERO || self.iterations == 0 {
            return Decimal::ONE;
        }

        let outcomes = self.effective_outcomes(score);
        let rate = score
            .smoothed
            .to_f64()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fractions: Vec<Decimal> = (0..self.iterations)
            .map(|_| {
                let wins = (0..outcomes).filter(|_| rng.gen_bool(rate)).count();
                let resampled = Decimal::from(wins) / Decimal::from(outcomes);
                KellyCalculator::full_fraction(score.adjust(resampled), entry_price)
            })
            .collect();
        fractions.sort();

        let index = (fractions.len() - 1) * usize::from(self.percentile) / 100;
        let lower = fractions[index];

        (lower / point).min(Decimal::ONE).max(Decimal::ZERO)
    }

    fn effective_outcomes(&self, score: &ConfidenceScore) -> u64 {
        let weight = score.prior_weight.round().to_u64().unwrap_or(0);
        (weight + score.total).clamp(1, self.max_outcomes)
    }
}

impl Default for UncertaintyHaircut {
    fn default() -> Self {
        Self::from_config(&SizingConfig::default())
    }
}
