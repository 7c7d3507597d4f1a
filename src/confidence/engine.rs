//! Empirical confidence engine

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::{Arc, RwLock};

use super::params::{BucketKey, ConfidenceParams, PriorSource};
use super::smoothing::{prior_weight, smooth};
use super::zones::{DurationBucket, PriceZone};
use super::kill;
use crate::classifier::Archetype;
use crate::signal::Side;

/// No bet is ever treated as more likely than this
pub const CONFIDENCE_CAP: Decimal = dec!(0.92);

/// Lowest confidence an unkilled bucket can report
pub const CONFIDENCE_FLOOR: Decimal = dec!(0.01);

/// Everything the engine worked out for one (archetype, side, price, duration)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceScore {
    /// Final confidence; zero when a kill rule fired
    pub confidence: Decimal,
    pub smoothed: Decimal,
    pub prior: Decimal,
    pub prior_source: PriorSource,
    pub prior_weight: Decimal,
    pub wins: u64,
    pub total: u64,
    pub zone: PriceZone,
    pub duration: DurationBucket,
    pub zone_modifier: Decimal,
    pub duration_modifier: Decimal,
    /// Id of the kill rule that fired
    pub killed_by: Option<String>,
}

impl ConfidenceScore {
    pub fn is_killed(&self) -> bool {
        self.killed_by.is_some()
    }

    /// Apply this score's modifiers and bounds to another smoothed estimate
    pub fn adjust(&self, smoothed: Decimal) -> Decimal {
        bound(smoothed * self.zone_modifier * self.duration_modifier)
    }
}

fn bound(p: Decimal) -> Decimal {
    p.min(CONFIDENCE_CAP).max(CONFIDENCE_FLOOR)
}

/// Turns buckets into calibrated win probabilities
///
/// Parameters sit behind a lock holding an `Arc`, so a calibration swap never
/// tears a reader's view.
#[derive(Debug)]
pub struct ConfidenceEngine {
    params: RwLock<Arc<ConfidenceParams>>,
}

impl ConfidenceEngine {
    pub fn new(params: ConfidenceParams) -> Self {
        Self {
            params: RwLock::new(Arc::new(params)),
        }
    }

    /// Current parameter set
    pub fn params(&self) -> Arc<ConfidenceParams> {
        let guard = self.params.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the parameter set wholesale
    pub fn replace_params(&self, params: ConfidenceParams) {
        let version = params.version;
        let mut guard = self.params.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(params);
        tracing::info!(version, "Confidence parameters replaced");
    }

    /// Score a bet on `side` at `entry_price` resolving in `days` days
    pub fn score(
        &self,
        archetype: Archetype,
        side: Side,
        entry_price: Decimal,
        days: Decimal,
    ) -> ConfidenceScore {
        let params = self.params();
        score_with(&params, archetype, side, entry_price, days)
    }
}

impl Default for ConfidenceEngine {
    fn default() -> Self {
        Self::new(ConfidenceParams::seeded())
    }
}

/// Pure scoring against an explicit parameter set
pub fn score_with(
    params: &ConfidenceParams,
    archetype: Archetype,
    side: Side,
    entry_price: Decimal,
    days: Decimal,
) -> ConfidenceScore {
    let zone = PriceZone::from_price(entry_price);
    let duration = DurationBucket::from_days(days);
    let zone_modifier = params.zone_modifier(zone);
    let duration_modifier = params.duration_modifier(duration);
    let (prior, prior_source) = params.prior(archetype, side);
    let weight = prior_weight(params.total_resolved);

    let key = BucketKey {
        archetype,
        side,
        zone,
        duration,
    };
    let (wins, total) = params
        .record(&key)
        .map(|r| (r.wins, r.total))
        .unwrap_or((0, 0));

    if total == 0 {
        tracing::debug!(
            %archetype,
            %side,
            ?zone,
            ?duration,
            ?prior_source,
            "No bucket samples, using archetype prior"
        );
    }

    let smoothed = smooth(prior, weight, wins, total);
    let mut score = ConfidenceScore {
        confidence: bound(smoothed * zone_modifier * duration_modifier),
        smoothed,
        prior,
        prior_source,
        prior_weight: weight,
        wins,
        total,
        zone,
        duration,
        zone_modifier,
        duration_modifier,
        killed_by: None,
    };

    if let Some(rule) = kill::first_match(&params.kill_rules, archetype, side, entry_price) {
        score.confidence = Decimal::ZERO;
        score.killed_by = Some(rule.id.clone());
    }

    score
}
