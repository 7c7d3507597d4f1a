//! Size modifiers and the per-source weights that scale them

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::Archetype;
use crate::config::SignalConfig;
use crate::market::{price_drift, volume_zscore, HistorySample};
use crate::signal::Side;

/// Source and modifier names, shared by readings, weights and reports
pub const EMPIRICAL: &str = "empirical";
pub const UNCERTAINTY_HAIRCUT: &str = "uncertainty_haircut";
pub const VOLUME_SPIKE: &str = "volume_spike";
pub const MOMENTUM: &str = "momentum";
pub const ARCHETYPE_BOOST: &str = "archetype_boost";

/// Sources calibration scores against outcomes
pub const SCORED_SOURCES: [&str; 4] = [EMPIRICAL, VOLUME_SPIKE, MOMENTUM, ARCHETYPE_BOOST];

/// Sources whose size modifier calibration can scale or disable
///
/// The empirical confidence is scored for the report only; it drives the
/// edge itself and is corrected by the parameter rebuild instead.
pub const WEIGHTED_SOURCES: [&str; 3] = [VOLUME_SPIKE, MOMENTUM, ARCHETYPE_BOOST];

/// Calibration-derived weight per signal source; missing sources weigh 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights(BTreeMap<String, Decimal>);

impl SourceWeights {
    pub fn get(&self, source: &str) -> Decimal {
        self.0.get(source).copied().unwrap_or(Decimal::ONE)
    }

    pub fn set(&mut self, source: impl Into<String>, weight: Decimal) {
        let weight = weight.max(Decimal::ZERO).min(Decimal::ONE);
        self.0.insert(source.into(), weight);
    }

    pub fn is_disabled(&self, source: &str) -> bool {
        self.get(source).is_zero()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Pull a raw multiplier toward 1 by a source weight
///
/// Weight 1 keeps the factor, weight 0 neutralizes it.
pub fn scale(factor: Decimal, weight: Decimal) -> Decimal {
    Decimal::ONE + (factor - Decimal::ONE) * weight
}

/// Volume spike: latest volume increment against the trailing increments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSpike {
    pub zscore: Option<f64>,
    /// Unweighted multiplier
    pub factor: Decimal,
}

pub fn volume_spike(samples: &[HistorySample], config: &SignalConfig) -> VolumeSpike {
    let zscore = volume_zscore(samples, config.min_volume_increments);
    let factor = match zscore {
        Some(z) if z >= config.volume_spike_z => config.volume_spike_boost,
        _ => Decimal::ONE,
    };
    VolumeSpike { zscore, factor }
}

/// Price momentum relative to the traded side
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Momentum {
    /// Not enough history or too small a move
    Flat(Option<Decimal>),
    /// Drifting toward the side; unweighted boost
    Toward { drift: Decimal, factor: Decimal },
    /// Drifting hard against the side
    Against(Decimal),
}

impl Momentum {
    pub fn drift(&self) -> Option<Decimal> {
        match self {
            Momentum::Flat(d) => *d,
            Momentum::Toward { drift, .. } => Some(*drift),
            Momentum::Against(d) => Some(*d),
        }
    }

    pub fn factor(&self) -> Decimal {
        match self {
            Momentum::Toward { factor, .. } => *factor,
            _ => Decimal::ONE,
        }
    }
}

pub fn momentum(samples: &[HistorySample], side: Side, config: &SignalConfig) -> Momentum {
    let lookback = chrono::Duration::minutes(config.momentum_lookback_minutes);
    match price_drift(samples, side, lookback) {
        Some(drift) if drift <= -config.momentum_block_drift => Momentum::Against(drift),
        Some(drift) if drift >= config.momentum_min_drift => Momentum::Toward {
            drift,
            factor: config.momentum_boost,
        },
        drift => Momentum::Flat(drift),
    }
}

/// Configured multiplier for an archetype, 1 when unset
pub fn archetype_boost(archetype: Archetype, config: &SignalConfig) -> Decimal {
    config
        .archetype_boosts
        .get(&archetype)
        .copied()
        .unwrap_or(Decimal::ONE)
}
