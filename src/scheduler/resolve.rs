//! Resolve-and-calibrate loop

use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::circuit::{SourceGuard, SourceHealth};
use crate::calibration::{CalibrationReport, Calibrator};
use crate::config::SourceConfig;
use crate::market::{ResolutionFeed, Settlement, SourceError};
use crate::portfolio::{Ledger, PositionStatus};
use crate::signal::SignalPipeline;

/// Counts for one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub checked: usize,
    pub won: usize,
    pub lost: usize,
    pub voided: usize,
    pub calibrated: bool,
}

/// Polls settlements for open positions and recalibrates every N resolutions
pub struct Resolver {
    feed: Arc<dyn ResolutionFeed>,
    guard: SourceGuard,
    ledger: Arc<Ledger>,
    pipeline: Arc<SignalPipeline>,
    calibrator: Calibrator,
    interval: Duration,
    since_calibration: AtomicUsize,
}

impl Resolver {
    pub fn new(
        feed: Arc<dyn ResolutionFeed>,
        ledger: Arc<Ledger>,
        pipeline: Arc<SignalPipeline>,
        calibrator: Calibrator,
        interval: Duration,
        source_config: &SourceConfig,
    ) -> Self {
        let guard = SourceGuard::from_config(feed.name(), source_config);
        Self {
            feed,
            guard,
            ledger,
            pipeline,
            calibrator,
            interval,
            since_calibration: AtomicUsize::new(0),
        }
    }

    pub fn health(&self) -> SourceHealth {
        self.guard.health()
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(source = %self.guard.name(), "Resolve loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.resolve_once().await;
                    if summary.checked > 0 {
                        tracing::info!(
                            checked = summary.checked,
                            won = summary.won,
                            lost = summary.lost,
                            voided = summary.voided,
                            calibrated = summary.calibrated,
                            "Resolve pass complete"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Resolve loop stopped");
    }

    /// Check every open position once; fetch failures wait for the next pass
    pub async fn resolve_once(&self) -> ResolveSummary {
        let mut summary = ResolveSummary::default();

        for position in self.ledger.open_positions().await {
            let settlement = match self
                .guard
                .call(self.feed.fetch_settlement(&position.market_id))
                .await
            {
                Ok(Some(settlement)) => settlement,
                Ok(None) => {
                    summary.checked += 1;
                    continue;
                }
                Err(SourceError::CircuitOpen(_)) => break,
                Err(_) => continue,
            };
            summary.checked += 1;

            let Ok(resolved) = self.ledger.resolve(position.id, settlement).await else {
                continue;
            };
            match (settlement, resolved.status) {
                (Settlement::Void, _) => summary.voided += 1,
                (_, PositionStatus::ResolvedWin) => summary.won += 1,
                _ => summary.lost += 1,
            }
        }

        let settled = summary.won + summary.lost;
        if settled > 0 {
            let pending = self.since_calibration.fetch_add(settled, Ordering::SeqCst) + settled;
            let every = self.calibrator.config().every_n_resolutions.max(1) as usize;
            if pending >= every {
                self.since_calibration.store(0, Ordering::SeqCst);
                summary.calibrated = self.calibrate().await.is_some();
            }
        }
        summary
    }

    /// Calibrate from everything resolved so far; failures are logged
    pub async fn calibrate(&self) -> Option<CalibrationReport> {
        let resolved = self.ledger.resolved_positions().await;
        match self
            .calibrator
            .run(self.pipeline.engine(), &self.pipeline, &resolved, Utc::now())
        {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "Calibration failed, keeping current parameters");
                None
            }
        }
    }
}
