//! The single owner of portfolio state
//!
//! Every mutation takes the one async mutex, re-validates against the locked
//! state, persists the next state atomically and only then commits it in
//! memory. A failed write leaves both disk and memory at the previous state.

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::state::PortfolioState;
use super::types::{LedgerError, PortfolioLimits, PortfolioView, Position};
use crate::config::PortfolioConfig;
use crate::market::Settlement;
use crate::signal::Signal;
use crate::store::{JsonFile, StoreError};
use crate::telemetry::{self, GaugeMetric};

/// Async handle over [`PortfolioState`]
#[derive(Debug)]
pub struct Ledger {
    state: Mutex<PortfolioState>,
    limits: PortfolioLimits,
    rolling_window: usize,
    store: Option<JsonFile>,
}

impl Ledger {
    /// Ledger without persistence
    pub fn in_memory(initial_bankroll: rust_decimal::Decimal, limits: PortfolioLimits) -> Self {
        Self {
            state: Mutex::new(PortfolioState::new(initial_bankroll)),
            limits,
            rolling_window: 50,
            store: None,
        }
    }

    /// Reload the state file, or start fresh at the initial bankroll
    pub fn load(config: &PortfolioConfig, rolling_window: usize) -> Result<Self, LedgerError> {
        let store = JsonFile::new(&config.state_path);
        let state = match store.load::<PortfolioState>()? {
            Some(state) => {
                tracing::info!(
                    path = %store.path().display(),
                    bankroll = %state.bankroll,
                    open = state.open_positions.len(),
                    resolved = state.resolved_positions.len(),
                    "Portfolio state loaded"
                );
                state
            }
            None => {
                tracing::info!(
                    path = %store.path().display(),
                    bankroll = %config.initial_bankroll,
                    "No portfolio state, starting fresh"
                );
                PortfolioState::new(config.initial_bankroll)
            }
        };

        publish(&state);
        Ok(Self {
            state: Mutex::new(state),
            limits: PortfolioLimits::from_config(config),
            rolling_window,
            store: Some(store),
        })
    }

    pub fn with_rolling_window(mut self, window: usize) -> Self {
        self.rolling_window = window;
        self
    }

    pub fn limits(&self) -> &PortfolioLimits {
        &self.limits
    }

    /// Open a position for an accepted signal
    ///
    /// The pipeline already checked the caps against a snapshot; a refusal
    /// here means that snapshot went stale or the two disagree.
    pub async fn open(&self, signal: &Signal) -> Result<Position, LedgerError> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let position = match next.open(signal, &self.limits, Utc::now()) {
            Ok(position) => position,
            Err(e) => {
                let code = e.reject_reason().map(|r| r.code().to_string());
                tracing::error!(
                    market_id = %signal.market_id,
                    group = %signal.correlation_group,
                    size = %signal.size_usd,
                    reason = code.as_deref().unwrap_or("invalid"),
                    error = %e,
                    "Ledger refused open"
                );
                telemetry::record_ledger_refusal("open");
                return Err(e);
            }
        };

        self.commit(&mut guard, next).await?;

        tracing::info!(
            position_id = %position.id,
            market_id = %position.market_id,
            side = %position.side,
            entry = %position.entry_price,
            size = %position.size_usd,
            group = %position.correlation_group,
            "Position opened"
        );
        telemetry::record_position(position.status.as_str(), position.correlation_group.as_str());
        Ok(position)
    }

    /// Settle an open position
    pub async fn resolve(&self, id: Uuid, settlement: Settlement) -> Result<Position, LedgerError> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let position = next.resolve(id, settlement, Utc::now()).map_err(|e| {
            tracing::error!(position_id = %id, ?settlement, error = %e, "Ledger refused resolve");
            telemetry::record_ledger_refusal("resolve");
            e
        })?;

        self.commit(&mut guard, next).await?;

        tracing::info!(
            position_id = %position.id,
            market_id = %position.market_id,
            status = %position.status,
            pnl = ?position.pnl,
            bankroll = %guard.bankroll,
            drawdown = %guard.drawdown_pct,
            "Position resolved"
        );
        telemetry::record_position(position.status.as_str(), position.correlation_group.as_str());
        Ok(position)
    }

    /// Close an open position without settlement
    pub async fn force_close(&self, id: Uuid, reason: &str) -> Result<Position, LedgerError> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let position = next.force_close(id, reason, Utc::now()).map_err(|e| {
            tracing::error!(position_id = %id, reason, error = %e, "Ledger refused force close");
            telemetry::record_ledger_refusal("force_close");
            e
        })?;

        self.commit(&mut guard, next).await?;

        tracing::warn!(
            position_id = %position.id,
            market_id = %position.market_id,
            reason,
            "Position force closed"
        );
        telemetry::record_position(position.status.as_str(), position.correlation_group.as_str());
        Ok(position)
    }

    /// Copy of the full state
    pub async fn state(&self) -> PortfolioState {
        self.state.lock().await.clone()
    }

    /// Snapshot used by the pipeline's admission check
    pub async fn view(&self) -> PortfolioView {
        self.state.lock().await.view(&self.limits, self.rolling_window)
    }

    pub async fn open_positions(&self) -> Vec<Position> {
        self.state.lock().await.open_positions.clone()
    }

    pub async fn resolved_positions(&self) -> Vec<Position> {
        self.state.lock().await.resolved_positions.clone()
    }

    async fn commit(
        &self,
        guard: &mut PortfolioState,
        next: PortfolioState,
    ) -> Result<(), LedgerError> {
        let next = match &self.store {
            Some(store) => persist(store.clone(), next).await.map_err(|e| {
                tracing::error!(path = %store.path().display(), error = %e, "Failed to persist portfolio");
                e
            })?,
            None => next,
        };
        *guard = next;
        publish(guard);
        Ok(())
    }
}

/// Write `state` on the blocking pool and hand it back once it is durable
async fn persist(store: JsonFile, state: PortfolioState) -> Result<PortfolioState, StoreError> {
    let path = store.path().to_path_buf();
    tokio::task::spawn_blocking(move || store.save(&state).map(|()| state))
        .await
        .map_err(|e| StoreError::Io {
            path,
            source: std::io::Error::other(e),
        })?
}

fn publish(state: &PortfolioState) {
    let f = |d: rust_decimal::Decimal| d.to_f64().unwrap_or(0.0);
    telemetry::set_gauge(GaugeMetric::Bankroll, f(state.bankroll));
    telemetry::set_gauge(GaugeMetric::Committed, f(state.committed));
    telemetry::set_gauge(GaugeMetric::DrawdownPct, f(state.drawdown_pct));
    telemetry::set_gauge(GaugeMetric::OpenPositions, state.open_positions.len() as f64);
}
