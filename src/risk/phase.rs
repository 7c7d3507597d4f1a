//! Operating phase and drawdown tracking
//!
//! The fractional Kelly multiplier depends on how much evidence the system has
//! and how it has been doing: conservative until enough trades resolve,
//! relaxed once the rolling win rate and drawdown both look healthy, and
//! tightened automatically on a drawdown breach.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;

/// Kelly regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingPhase {
    Conservative,
    Growth,
    Defensive,
}

/// Portfolio facts the phase depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseInputs {
    pub total_resolved: u64,
    /// Win rate over the most recent resolved trades
    pub rolling_win_rate: Option<Decimal>,
    pub drawdown: Decimal,
}

/// Choose the phase; a drawdown breach overrides everything else
pub fn select_phase(config: &SizingConfig, inputs: &PhaseInputs) -> OperatingPhase {
    if inputs.drawdown >= config.breach_drawdown {
        return OperatingPhase::Defensive;
    }

    if inputs.total_resolved < config.min_resolved_for_growth {
        return OperatingPhase::Conservative;
    }

    match inputs.rolling_win_rate {
        Some(rate)
            if rate >= config.growth_min_win_rate
                && inputs.drawdown <= config.growth_max_drawdown =>
        {
            OperatingPhase::Growth
        }
        _ => OperatingPhase::Conservative,
    }
}

/// Kelly multiplier for a phase
pub fn phase_fraction(config: &SizingConfig, phase: OperatingPhase) -> Decimal {
    match phase {
        OperatingPhase::Conservative => config.conservative_fraction,
        OperatingPhase::Growth => config.growth_fraction,
        OperatingPhase::Defensive => config.defensive_fraction,
    }
}

/// Drawdown from peak, zero when at or above peak
pub fn drawdown(peak: Decimal, current: Decimal) -> Decimal {
    if peak <= Decimal::ZERO || current >= peak {
        return Decimal::ZERO;
    }
    (peak - current) / peak
}
