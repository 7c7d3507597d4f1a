//! Risk module
//!
//! Edge, variable-odds Kelly sizing, operating phases and the bootstrap
//! uncertainty haircut

mod bootstrap;
mod kelly;
mod phase;
mod sizing;

pub use bootstrap::UncertaintyHaircut;
pub use kelly::KellyCalculator;
pub use phase::{drawdown, phase_fraction, select_phase, OperatingPhase, PhaseInputs};
pub use sizing::{PositionSizer, SizeDecision};
