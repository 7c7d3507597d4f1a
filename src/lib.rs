//! poly-edge: decision core for a prediction-market trading agent
//!
//! This library provides the core components for:
//! - Archetype classification of market titles
//! - Empirical confidence with Bayesian smoothing and kill rules
//! - Edge, Kelly and phase-based sizing
//! - The ordered signal pipeline
//! - A persisted portfolio ledger with correlation caps
//! - Calibration of confidence and source weights from outcomes
//! - Scan and resolve loops with per-source circuit breakers

pub mod calibration;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod confidence;
pub mod market;
pub mod portfolio;
pub mod risk;
pub mod scheduler;
pub mod signal;
pub mod store;
pub mod telemetry;
