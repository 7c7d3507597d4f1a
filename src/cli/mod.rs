//! CLI interface for poly-edge
//!
//! Provides subcommands for:
//! - `run`: Start the scan and resolve loops
//! - `evaluate`: One-shot evaluation of a snapshot file
//! - `status`: Portfolio state from the state file
//! - `report`: Last calibration report and win-rate tables
//! - `config`: Show the effective configuration

mod evaluate;
mod run;
mod status;

pub use evaluate::EvaluateArgs;
pub use run::RunArgs;
pub use status::{print_report, print_status};

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "poly-edge")]
#[command(about = "Decision core for a prediction-market trading agent")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the scan and resolve loops
    Run(RunArgs),
    /// Evaluate a JSON file of snapshots and print the signals
    Evaluate(EvaluateArgs),
    /// Show portfolio state
    Status,
    /// Show the last calibration report
    Report,
    /// Show the effective configuration
    Config,
}
