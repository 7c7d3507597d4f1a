//! Calibration and feedback loop
//!
//! Consumes resolved positions and produces the next confidence parameter
//! set, per-source weights, a calibration curve and win-rate tables.

mod curve;
mod rebuild;
mod report;
mod skill;

pub use curve::{build_curve, CalibrationBucket, CalibrationCurve};
pub use rebuild::rebuild_params;
pub use report::{win_rate_table, CalibrationReport, Calibrator, WinRateRow};
pub use skill::{pearson, score_sources, weight_for, SourceSkill};
