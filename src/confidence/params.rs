//! Confidence engine parameter set
//!
//! Everything the engine reads lives in one value so calibration can swap it
//! wholesale.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::kill::{seed_rules, KillRule};
use super::zones::{DurationBucket, PriceZone};
use crate::classifier::Archetype;
use crate::signal::Side;

/// Key of one empirical bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub archetype: Archetype,
    pub side: Side,
    pub zone: PriceZone,
    pub duration: DurationBucket,
}

/// Observed outcomes for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRecord {
    #[serde(flatten)]
    pub key: BucketKey,
    pub wins: u64,
    pub total: u64,
    /// Smoothed win probability at the time of the last rebuild
    pub smoothed: Decimal,
    pub last_updated: DateTime<Utc>,
}

/// Prior win rate for one archetype and side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypePrior {
    pub archetype: Archetype,
    pub side: Side,
    pub win_rate: Decimal,
}

/// Where a prior came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorSource {
    ArchetypeSide,
    /// Mean over the archetype's sides
    Archetype,
    /// System base rate; no archetype prior exists
    BaseRate,
}

/// Full engine parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParamsFile", into = "ParamsFile")]
pub struct ConfidenceParams {
    /// Incremented on every calibration rebuild
    pub version: u32,
    /// Resolved trades system-wide; drives the prior weight schedule
    pub total_resolved: u64,
    /// Fallback win rate when an archetype has no prior at all
    pub base_rate: Decimal,
    pub priors: HashMap<(Archetype, Side), Decimal>,
    pub records: HashMap<BucketKey, ConfidenceRecord>,
    pub zone_modifiers: BTreeMap<PriceZone, Decimal>,
    pub duration_modifiers: BTreeMap<DurationBucket, Decimal>,
    pub kill_rules: Vec<KillRule>,
    pub updated_at: DateTime<Utc>,
}

impl ConfidenceParams {
    /// Illustrative seed values used until calibration has real outcomes
    pub fn seeded() -> Self {
        let table: [(Archetype, Decimal, Decimal); 16] = [
            (Archetype::DailyUpdown, dec!(0.83), dec!(0.80)),
            (Archetype::IntradayUpdown, dec!(0.78), dec!(0.76)),
            (Archetype::PriceAbove, dec!(0.80), dec!(0.82)),
            (Archetype::PriceRange, dec!(0.30), dec!(0.88)),
            (Archetype::SportsWinner, dec!(0.25), dec!(0.90)),
            (Archetype::SportsSingleGame, dec!(0.51), dec!(0.49)),
            (Archetype::Election, dec!(0.82), dec!(0.85)),
            (Archetype::Geopolitical, dec!(0.30), dec!(0.88)),
            (Archetype::Weather, dec!(0.35), dec!(0.86)),
            (Archetype::SocialCount, dec!(0.33), dec!(0.84)),
            (Archetype::Entertainment, dec!(0.35), dec!(0.85)),
            (Archetype::DeadlineBinary, dec!(0.28), dec!(0.87)),
            (Archetype::Parlay, dec!(0.20), dec!(0.75)),
            (Archetype::FinancialPrice, dec!(0.79), dec!(0.80)),
            (Archetype::GameTotal, dec!(0.52), dec!(0.50)),
            (Archetype::Directional, dec!(0.70), dec!(0.72)),
        ];

        let priors = table
            .iter()
            .flat_map(|(a, yes, no)| [((*a, Side::Yes), *yes), ((*a, Side::No), *no)])
            .collect();

        Self {
            version: 0,
            total_resolved: 0,
            base_rate: dec!(0.55),
            priors,
            records: HashMap::new(),
            zone_modifiers: PriceZone::seed_modifiers(),
            duration_modifiers: DurationBucket::seed_modifiers(),
            kill_rules: seed_rules(),
            updated_at: Utc::now(),
        }
    }

    /// Prior for `(archetype, side)` with its provenance
    ///
    /// Falls back to the archetype mean, then the base rate; never to a flat 0.5.
    pub fn prior(&self, archetype: Archetype, side: Side) -> (Decimal, PriorSource) {
        if let Some(p) = self.priors.get(&(archetype, side)) {
            return (*p, PriorSource::ArchetypeSide);
        }

        let sides: Vec<Decimal> = [Side::Yes, Side::No]
            .iter()
            .filter_map(|s| self.priors.get(&(archetype, *s)).copied())
            .collect();
        if !sides.is_empty() {
            let mean = sides.iter().sum::<Decimal>() / Decimal::from(sides.len());
            return (mean, PriorSource::Archetype);
        }

        (self.base_rate, PriorSource::BaseRate)
    }

    pub fn record(&self, key: &BucketKey) -> Option<&ConfidenceRecord> {
        self.records.get(key)
    }

    pub fn zone_modifier(&self, zone: PriceZone) -> Decimal {
        self.zone_modifiers.get(&zone).copied().unwrap_or(Decimal::ONE)
    }

    pub fn duration_modifier(&self, bucket: DurationBucket) -> Decimal {
        self.duration_modifiers
            .get(&bucket)
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}

impl Default for ConfidenceParams {
    fn default() -> Self {
        Self::seeded()
    }
}

/// On-disk shape: maps with tuple or struct keys become lists
#[derive(Serialize, Deserialize)]
struct ParamsFile {
    version: u32,
    total_resolved: u64,
    base_rate: Decimal,
    priors: Vec<ArchetypePrior>,
    records: Vec<ConfidenceRecord>,
    zone_modifiers: BTreeMap<PriceZone, Decimal>,
    duration_modifiers: BTreeMap<DurationBucket, Decimal>,
    kill_rules: Vec<KillRule>,
    updated_at: DateTime<Utc>,
}

impl From<ParamsFile> for ConfidenceParams {
    fn from(file: ParamsFile) -> Self {
        Self {
            version: file.version,
            total_resolved: file.total_resolved,
            base_rate: file.base_rate,
            priors: file
                .priors
                .into_iter()
                .map(|p| ((p.archetype, p.side), p.win_rate))
                .collect(),
            records: file.records.into_iter().map(|r| (r.key, r)).collect(),
            zone_modifiers: file.zone_modifiers,
            duration_modifiers: file.duration_modifiers,
            kill_rules: file.kill_rules,
            updated_at: file.updated_at,
        }
    }
}

impl From<ConfidenceParams> for ParamsFile {
    fn from(params: ConfidenceParams) -> Self {
        let mut priors: Vec<ArchetypePrior> = params
            .priors
            .into_iter()
            .map(|((archetype, side), win_rate)| ArchetypePrior {
                archetype,
                side,
                win_rate,
            })
            .collect();
        priors.sort_by_key(|p| (p.archetype, p.side));

        let mut records: Vec<ConfidenceRecord> = params.records.into_values().collect();
        records.sort_by_key(|r| r.key);

        Self {
            version: params.version,
            total_resolved: params.total_resolved,
            base_rate: params.base_rate,
            priors,
            records,
            zone_modifiers: params.zone_modifiers,
            duration_modifiers: params.duration_modifiers,
            kill_rules: params.kill_rules,
            updated_at: params.updated_at,
        }
    }
}
