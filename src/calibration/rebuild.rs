//! Rebuild confidence parameters from resolved positions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};

use crate::classifier::Archetype;
use crate::confidence::{
    enforce_monotonic, prior_weight, smooth, BucketKey, ConfidenceParams, ConfidenceRecord,
    DurationBucket, PriceZone,
};
use crate::portfolio::Position;
use crate::signal::Side;

/// Bounds on any rebuilt zone or duration modifier
const MODIFIER_MIN: Decimal = dec!(0.5);
const MODIFIER_MAX: Decimal = dec!(1.5);

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    wins: u64,
    total: u64,
}

impl Tally {
    fn add(&mut self, won: bool) {
        self.total += 1;
        if won {
            self.wins += 1;
        }
    }
}

/// Observed wins against the rate a baseline expected for the same positions
#[derive(Debug, Default, Clone, Copy)]
struct Residual {
    wins: u64,
    total: u64,
    expected_sum: Decimal,
}

impl Residual {
    fn add(&mut self, won: bool, expected: Decimal) {
        self.total += 1;
        if won {
            self.wins += 1;
        }
        self.expected_sum += expected;
    }

    /// Observed over expected win rate; `None` when the baseline expected nothing
    fn ratio(&self) -> Option<Decimal> {
        if self.total == 0 || self.expected_sum <= Decimal::ZERO {
            return None;
        }
        Some(Decimal::from(self.wins) / self.expected_sum)
    }
}

/// New parameter set from `previous` and every resolved win or loss
///
/// Priors and bucket records are smoothed toward the observed outcomes under
/// the prior-weight schedule. Zone and duration modifiers measure what the
/// rebuilt buckets leave unexplained: the zone modifier is observed wins over
/// the bucket baseline, the duration modifier is observed wins over the bucket
/// baseline with the new zone modifier applied. Both are anchored on their
/// seeds. Kill rules and the base rate carry over unchanged.
pub fn rebuild_params(
    previous: &ConfidenceParams,
    resolved: &[Position],
    now: DateTime<Utc>,
) -> ConfidenceParams {
    let seed = ConfidenceParams::seeded();

    let outcomes: Vec<(&Position, bool)> = resolved
        .iter()
        .filter_map(|p| p.won().map(|won| (p, won)))
        .collect();
    let total = outcomes.len() as u64;

    let mut by_prior: HashMap<(Archetype, Side), Tally> = HashMap::new();
    let mut by_bucket: HashMap<BucketKey, Tally> = HashMap::new();
    for (position, won) in &outcomes {
        by_prior
            .entry((position.archetype, position.side))
            .or_default()
            .add(*won);
        if let Some(key) = bucket_key(position) {
            by_bucket.entry(key).or_default().add(*won);
        }
    }

    let weight = prior_weight(total);

    let mut priors = previous.priors.clone();
    for ((archetype, side), tally) in &by_prior {
        let (anchor, _) = seed.prior(*archetype, *side);
        let prior = smooth(anchor, weight, tally.wins, tally.total).round_dp(4);
        priors.insert((*archetype, *side), prior);
    }

    let mut next = ConfidenceParams {
        version: previous.version + 1,
        total_resolved: total,
        base_rate: previous.base_rate,
        priors,
        records: HashMap::new(),
        zone_modifiers: previous.zone_modifiers.clone(),
        duration_modifiers: previous.duration_modifiers.clone(),
        kill_rules: previous.kill_rules.clone(),
        updated_at: now,
    };

    for (key, tally) in by_bucket {
        let (prior, _) = next.prior(key.archetype, key.side);
        next.records.insert(
            key,
            ConfidenceRecord {
                key,
                wins: tally.wins,
                total: tally.total,
                smoothed: smooth(prior, weight, tally.wins, tally.total).round_dp(4),
                last_updated: now,
            },
        );
    }

    let baseline = |key: &BucketKey| next.record(key).map(|r| r.smoothed).unwrap_or_default();

    let mut by_zone: BTreeMap<PriceZone, Residual> = BTreeMap::new();
    for (position, won) in &outcomes {
        if let Some(key) = bucket_key(position) {
            by_zone.entry(key.zone).or_default().add(*won, baseline(&key));
        }
    }
    let mut zone_modifiers = next.zone_modifiers.clone();
    for (zone, residual) in &by_zone {
        if let Some(m) = rebuilt_modifier(seed.zone_modifier(*zone), weight, residual) {
            zone_modifiers.insert(*zone, m);
        }
    }
    enforce_monotonic(&mut zone_modifiers);

    let mut by_duration: BTreeMap<DurationBucket, Residual> = BTreeMap::new();
    for (position, won) in &outcomes {
        if let Some(key) = bucket_key(position) {
            let zone_modifier = zone_modifiers
                .get(&key.zone)
                .copied()
                .unwrap_or(Decimal::ONE);
            by_duration
                .entry(key.duration)
                .or_default()
                .add(*won, baseline(&key) * zone_modifier);
        }
    }
    let mut duration_modifiers = next.duration_modifiers.clone();
    for (bucket, residual) in &by_duration {
        if let Some(m) = rebuilt_modifier(seed.duration_modifier(*bucket), weight, residual) {
            duration_modifiers.insert(*bucket, m);
        }
    }

    next.zone_modifiers = zone_modifiers;
    next.duration_modifiers = duration_modifiers;

    tracing::debug!(
        version = next.version,
        total_resolved = total,
        buckets = next.records.len(),
        "Confidence parameters rebuilt"
    );
    next
}

fn bucket_key(position: &Position) -> Option<BucketKey> {
    Some(BucketKey {
        archetype: position.archetype,
        side: position.side,
        zone: position.price_zone?,
        duration: position.duration_bucket?,
    })
}

/// Blend an observed residual ratio toward the seed with the schedule weight
fn rebuilt_modifier(anchor: Decimal, weight: Decimal, residual: &Residual) -> Option<Decimal> {
    let observed = residual.ratio()?;
    let n = Decimal::from(residual.total);
    let blended = (anchor * weight + observed * n) / (weight + n);
    Some(blended.max(MODIFIER_MIN).min(MODIFIER_MAX).round_dp(4))
}
