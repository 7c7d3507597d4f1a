//! Signal types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classifier::Archetype;
use crate::confidence::{DurationBucket, PriceZone};
use crate::portfolio::CorrelationGroup;

/// Trading side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy Yes shares
    Yes,
    /// Buy No shares
    No,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

/// Final pipeline decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

/// Why a signal was rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Snapshot failed validation (code carried from `MarketError`)
    InvalidMarket(String),
    /// A kill rule fired; carries the rule id
    Killed(String),
    /// Edge below the configured minimum
    EdgeBelowMinimum(Decimal),
    /// Traded side priced below the implied-probability floor
    ImpliedProbabilityBelowFloor(Decimal),
    /// Kelly fraction is zero
    NoKellyEdge,
    /// Price drifting hard against the traded side
    MomentumAgainst(Decimal),
    /// Final size under the minimum bet
    BelowMinBet(Decimal),
    /// Correlation group already at its cap
    CorrelationCapExceeded(CorrelationGroup),
    /// Global concurrency cap reached
    MaxOpenPositions,
    /// A position on this market is already open
    AlreadyPositioned,
    /// Not enough uncommitted bankroll
    InsufficientBankroll(Decimal),
    /// Any other admission refusal; carries the ledger's message
    AdmissionRefused(String),
}

impl RejectReason {
    /// Stable reason code
    pub fn code(&self) -> &str {
        match self {
            RejectReason::InvalidMarket(code) => code,
            RejectReason::Killed(rule) => rule,
            RejectReason::EdgeBelowMinimum(_) => "edge_below_minimum",
            RejectReason::ImpliedProbabilityBelowFloor(_) => "implied_probability_below_floor",
            RejectReason::NoKellyEdge => "no_kelly_edge",
            RejectReason::MomentumAgainst(_) => "momentum_against",
            RejectReason::BelowMinBet(_) => "below_min_bet",
            RejectReason::CorrelationCapExceeded(_) => "correlation_cap_exceeded",
            RejectReason::MaxOpenPositions => "max_open_positions",
            RejectReason::AlreadyPositioned => "already_positioned",
            RejectReason::InsufficientBankroll(_) => "insufficient_bankroll",
            RejectReason::AdmissionRefused(_) => "admission_refused",
        }
    }
}

/// Reason code carried by accepted signals
pub const ACCEPTED: &str = "accepted";

/// A multiplicative adjustment applied to the Kelly fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Stage name (`uncertainty_haircut`, `volume_spike`, ...)
    pub name: String,
    /// Multiplier actually applied
    pub factor: Decimal,
}

/// A prediction contributed by one signal source, kept for skill scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub source: String,
    pub value: Decimal,
}

/// Output of one pipeline evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub market_id: String,
    pub title: String,
    pub archetype: Archetype,
    pub side: Side,
    /// Traded side's cost
    pub entry_price: Decimal,
    /// Confidence from the engine before any sizing
    pub base_confidence: Decimal,
    pub edge: Decimal,
    /// Final fraction of bankroll after phase, haircut and modifiers
    pub kelly_fraction: Decimal,
    pub size_usd: Decimal,
    pub modifiers_applied: Vec<Modifier>,
    pub decision: Decision,
    pub reason: String,
    pub correlation_group: CorrelationGroup,
    pub price_zone: Option<PriceZone>,
    pub duration_bucket: Option<DurationBucket>,
    pub source_readings: Vec<SourceReading>,
    pub evaluated_at: DateTime<Utc>,
}

impl Signal {
    pub fn is_accepted(&self) -> bool {
        self.decision == Decision::Accept
    }

    /// Mark as rejected, keeping whatever was computed so far
    pub fn reject(mut self, reason: &RejectReason) -> Self {
        self.decision = Decision::Reject;
        self.reason = reason.code().to_string();
        self.size_usd = Decimal::ZERO;
        self
    }

    /// Modifier factor by name, if applied
    pub fn modifier(&self, name: &str) -> Option<Decimal> {
        self.modifiers_applied
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
    }

    #[test]
    fn test_reject_codes_are_stable() {
        assert_eq!(RejectReason::Killed("unclassified_archetype".into()).code(), "unclassified_archetype");
        assert_eq!(
            RejectReason::CorrelationCapExceeded(CorrelationGroup::Crypto).code(),
            "correlation_cap_exceeded"
        );
        assert_eq!(RejectReason::EdgeBelowMinimum(dec!(0.01)).code(), "edge_below_minimum");
        assert_eq!(RejectReason::InvalidMarket("invalid_market_state".into()).code(), "invalid_market_state");
    }

    #[test]
    fn test_side_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Yes).unwrap(), "\"yes\"");
        assert_eq!(serde_json::to_string(&Decision::Reject).unwrap(), "\"reject\"");
    }
}
