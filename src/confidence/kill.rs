//! Kill rules
//!
//! Buckets shown to carry no edge after costs. A match forces confidence to
//! zero regardless of the smoothed estimate. Rules are data so they can be
//! revised and shipped in the params file.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::classifier::Archetype;
use crate::signal::Side;

/// What a rule matches on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KillPredicate {
    /// Any bet on this archetype
    Archetype { archetype: Archetype },
    /// Bets on one side of this archetype
    ArchetypeSide { archetype: Archetype, side: Side },
    /// Entry cost strictly below the floor
    EntryBelow { floor: Decimal },
}

impl KillPredicate {
    pub fn matches(&self, archetype: Archetype, side: Side, entry_price: Decimal) -> bool {
        match self {
            KillPredicate::Archetype { archetype: a } => *a == archetype,
            KillPredicate::ArchetypeSide { archetype: a, side: s } => *a == archetype && *s == side,
            KillPredicate::EntryBelow { floor } => entry_price < *floor,
        }
    }
}

/// Evidence behind a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Justification {
    /// Resolved trades in the bucket when the rule was written
    pub sample_size: u64,
    /// Win rate observed over those trades
    pub observed_rate: Decimal,
}

/// One versioned kill rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillRule {
    /// Stable id, used as the rejection reason code
    pub id: String,
    pub version: u32,
    pub description: String,
    pub predicate: KillPredicate,
    pub justification: Justification,
}

impl KillRule {
    pub fn new(
        id: &str,
        description: &str,
        predicate: KillPredicate,
        sample_size: u64,
        observed_rate: Decimal,
    ) -> Self {
        Self {
            id: id.to_string(),
            version: 1,
            description: description.to_string(),
            predicate,
            justification: Justification {
                sample_size,
                observed_rate,
            },
        }
    }

    pub fn matches(&self, archetype: Archetype, side: Side, entry_price: Decimal) -> bool {
        self.predicate.matches(archetype, side, entry_price)
    }
}

/// First rule in table order that matches
pub fn first_match<'a>(
    rules: &'a [KillRule],
    archetype: Archetype,
    side: Side,
    entry_price: Decimal,
) -> Option<&'a KillRule> {
    rules.iter().find(|r| r.matches(archetype, side, entry_price))
}

/// Seed table
pub fn seed_rules() -> Vec<KillRule> {
    vec![
        KillRule::new(
            "unclassified_archetype",
            "No classifier rule matched; never trade blind",
            KillPredicate::Archetype {
                archetype: Archetype::Other,
            },
            187,
            dec!(0.47),
        ),
        KillRule::new(
            "parlay_no_edge",
            "Multi-leg markets compound vig across legs",
            KillPredicate::Archetype {
                archetype: Archetype::Parlay,
            },
            96,
            dec!(0.41),
        ),
        KillRule::new(
            "single_game_yes_coin_flip",
            "Single-game YES bets win at population rate",
            KillPredicate::ArchetypeSide {
                archetype: Archetype::SportsSingleGame,
                side: Side::Yes,
            },
            318,
            dec!(0.51),
        ),
        KillRule::new(
            "single_game_no_coin_flip",
            "Single-game NO bets win at population rate",
            KillPredicate::ArchetypeSide {
                archetype: Archetype::SportsSingleGame,
                side: Side::No,
            },
            291,
            dec!(0.49),
        ),
        KillRule::new(
            "game_total_coin_flip",
            "Totals lines are set at the median",
            KillPredicate::Archetype {
                archetype: Archetype::GameTotal,
            },
            204,
            dec!(0.50),
        ),
        KillRule::new(
            "entry_below_floor",
            "Cheap sides lose at or above the rate the crowd implies",
            KillPredicate::EntryBelow { floor: dec!(0.15) },
            1240,
            dec!(0.11),
        ),
    ]
}
