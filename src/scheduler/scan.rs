//! Scan-and-signal loop

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::circuit::{SourceGuard, SourceHealth};
use crate::config::{ScanConfig, SourceConfig};
use crate::market::{MarketHistory, MarketSource, SourceError};
use crate::portfolio::Ledger;
use crate::signal::{Signal, SignalPipeline};
use crate::telemetry::{record_latency, set_gauge, GaugeMetric, LatencyMetric};

/// Counts for one scan cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub markets: usize,
    pub evaluated: usize,
    pub accepted: usize,
    pub opened: usize,
    /// Accepted, but the ledger had moved on by the time it was opened
    pub stale: usize,
    /// Left unevaluated when the cycle budget ran out
    pub abandoned: usize,
}

/// Fetches snapshots, evaluates them and opens accepted signals
pub struct Scanner {
    source: Arc<dyn MarketSource>,
    guard: SourceGuard,
    pipeline: Arc<SignalPipeline>,
    ledger: Arc<Ledger>,
    history: Mutex<MarketHistory>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn MarketSource>,
        pipeline: Arc<SignalPipeline>,
        ledger: Arc<Ledger>,
        config: ScanConfig,
        source_config: &SourceConfig,
    ) -> Self {
        let guard = SourceGuard::from_config(source.name(), source_config);
        let history = MarketHistory::new(
            chrono::Duration::minutes(config.history_window_minutes),
            config.history_max_samples,
        );
        Self {
            source,
            guard,
            pipeline,
            ledger,
            history: Mutex::new(history),
            config,
        }
    }

    pub fn health(&self) -> SourceHealth {
        self.guard.health()
    }

    /// Run cycles every `interval` until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            source = %self.guard.name(),
            interval_secs = self.config.interval_secs,
            budget_secs = self.config.cycle_budget_secs,
            "Scan loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.scan_once(Utc::now()).await {
                        Ok(summary) => tracing::info!(
                            markets = summary.markets,
                            evaluated = summary.evaluated,
                            accepted = summary.accepted,
                            opened = summary.opened,
                            stale = summary.stale,
                            abandoned = summary.abandoned,
                            "Scan cycle complete"
                        ),
                        Err(e) => tracing::warn!(error = %e, "Scan cycle skipped"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scan loop stopped");
    }

    /// One cycle: fetch, record history, evaluate within budget, open accepted
    pub async fn scan_once(&self, now: DateTime<Utc>) -> Result<ScanSummary, SourceError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.cycle_budget();

        let snapshots = self.guard.call(self.source.fetch_markets()).await?;
        set_gauge(GaugeMetric::ActiveMarkets, snapshots.len() as f64);

        let work: Vec<_> = {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            for snapshot in &snapshots {
                history.record(snapshot, now);
            }
            history.prune(now);
            snapshots
                .into_iter()
                .map(|s| {
                    let samples = history.samples(&s.id);
                    (s, samples)
                })
                .collect()
        };

        let mut summary = ScanSummary {
            markets: work.len(),
            ..ScanSummary::default()
        };

        let view = Arc::new(self.ledger.view().await);
        let evaluations = stream::iter(work)
            .map(|(snapshot, samples)| {
                let pipeline = Arc::clone(&self.pipeline);
                let view = Arc::clone(&view);
                tokio::task::spawn_blocking(move || pipeline.evaluate(&snapshot, &samples, &view, now))
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .take_until(tokio::time::sleep_until(deadline));
        futures_util::pin_mut!(evaluations);

        while let Some(joined) = evaluations.next().await {
            let signal = match joined {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::error!(error = %e, "Evaluation task failed");
                    continue;
                }
            };
            summary.evaluated += 1;
            if signal.is_accepted() {
                summary.accepted += 1;
                self.open(&signal, &mut summary).await;
            }
        }

        summary.abandoned = summary.markets.saturating_sub(summary.evaluated);
        if summary.abandoned > 0 {
            tracing::warn!(
                abandoned = summary.abandoned,
                budget_secs = self.config.cycle_budget_secs,
                "Scan cycle over budget"
            );
        }
        record_latency(LatencyMetric::ScanCycle, started.elapsed());
        Ok(summary)
    }

    /// Signals were admitted against the cycle's opening view; positions
    /// opened since then can make one stale
    async fn open(&self, signal: &Signal, summary: &mut ScanSummary) {
        let current = self.ledger.view().await;
        if let Err(e) = current.admit(&signal.market_id, signal.correlation_group, signal.size_usd) {
            tracing::debug!(market_id = %signal.market_id, reason = %e, "Skipping stale signal");
            summary.stale += 1;
            return;
        }

        if self.ledger.open(signal).await.is_ok() {
            summary.opened += 1;
        }
    }
}
