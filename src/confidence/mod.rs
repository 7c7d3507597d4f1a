//! Empirical confidence
//!
//! Turns (archetype, side, price zone, duration bucket) into a win
//! probability smoothed toward the archetype prior, and enforces kill rules.

mod engine;
mod kill;
mod params;
mod smoothing;
mod zones;

pub use engine::{score_with, ConfidenceEngine, ConfidenceScore, CONFIDENCE_CAP, CONFIDENCE_FLOOR};
pub use kill::{first_match, seed_rules, Justification, KillPredicate, KillRule};
pub use params::{ArchetypePrior, BucketKey, ConfidenceParams, ConfidenceRecord, PriorSource};
pub use smoothing::{prior_weight, smooth};
pub use zones::{enforce_monotonic, DurationBucket, PriceZone};
