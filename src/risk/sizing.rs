//! Ceiling and floor on the final dollar size

use rust_decimal::Decimal;

use crate::config::SizingConfig;

/// Outcome of applying the position limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDecision {
    /// Size after the ceiling
    Bet(Decimal),
    /// Smaller than the minimum bet
    BelowMinimum(Decimal),
}

/// Applies the per-position ceiling and the minimum bet
#[derive(Debug, Clone)]
pub struct PositionSizer {
    /// Maximum position as a fraction of bankroll
    pub max_position_pct: Decimal,
    /// Minimum trade size in dollars
    pub min_bet_usd: Decimal,
}

impl PositionSizer {
    pub fn new(max_position_pct: Decimal, min_bet_usd: Decimal) -> Self {
        Self {
            max_position_pct,
            min_bet_usd,
        }
    }

    pub fn from_config(config: &SizingConfig) -> Self {
        Self::new(config.max_position_pct, config.min_bet_usd)
    }

    /// Bankroll times the final fraction, capped, then checked against the floor
    pub fn size(&self, bankroll: Decimal, fraction: Decimal) -> SizeDecision {
        let raw = (bankroll * fraction).max(Decimal::ZERO);
        let capped = raw.min(bankroll * self.max_position_pct).round_dp(2);

        if capped < self.min_bet_usd || capped <= Decimal::ZERO {
            SizeDecision::BelowMinimum(capped)
        } else {
            SizeDecision::Bet(capped)
        }
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::from_config(&SizingConfig::default())
    }
}
