//! Evaluate command implementation

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use std::path::PathBuf;

use super::run::decision_core;
use crate::config::Config;
use crate::market::MarketSnapshot;
use crate::portfolio::Ledger;
use crate::signal::Signal;

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// JSON array of market snapshots
    pub snapshots: PathBuf,

    /// Only print accepted signals
    #[arg(long)]
    pub accepted_only: bool,

    /// Open positions for accepted signals in the ledger state file
    #[arg(long)]
    pub commit: bool,
}

impl EvaluateArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let content = tokio::fs::read_to_string(&self.snapshots)
            .await
            .with_context(|| format!("reading {}", self.snapshots.display()))?;
        let snapshots: Vec<MarketSnapshot> = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.snapshots.display()))?;

        let (_, _, pipeline) = decision_core(config)?;
        let ledger = Ledger::load(&config.portfolio, config.sizing.rolling_window)?;

        let now = Utc::now();
        let mut signals: Vec<Signal> = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            // single snapshots carry no history
            let view = ledger.view().await;
            let signal = pipeline.evaluate(snapshot, &[], &view, now);
            if self.commit && signal.is_accepted() {
                ledger.open(&signal).await?;
            }
            signals.push(signal);
        }

        let accepted = signals.iter().filter(|s| s.is_accepted()).count();
        tracing::info!(
            evaluated = signals.len(),
            accepted,
            committed = self.commit,
            "Evaluation complete"
        );

        if self.accepted_only {
            signals.retain(|s| s.is_accepted());
        }
        println!("{}", serde_json::to_string_pretty(&signals)?);
        Ok(())
    }
}
