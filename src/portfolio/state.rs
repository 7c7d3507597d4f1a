//! Portfolio state machine
//!
//! Pure bookkeeping with no locking or I/O; [`super::Ledger`] owns the one
//! live instance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::types::{LedgerError, PortfolioLimits, PortfolioView, Position, PositionStatus};
use crate::market::Settlement;
use crate::risk::drawdown;
use crate::signal::Signal;

/// Bankroll and positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Realized equity, including stakes still committed to open positions
    pub bankroll: Decimal,
    pub peak_bankroll: Decimal,
    /// Stakes reserved by open positions
    pub committed: Decimal,
    pub open_positions: Vec<Position>,
    pub resolved_positions: Vec<Position>,
    pub drawdown_pct: Decimal,
}

impl PortfolioState {
    pub fn new(initial_bankroll: Decimal) -> Self {
        Self {
            bankroll: initial_bankroll,
            peak_bankroll: initial_bankroll,
            committed: Decimal::ZERO,
            open_positions: Vec::new(),
            resolved_positions: Vec::new(),
            drawdown_pct: Decimal::ZERO,
        }
    }

    /// Bankroll not reserved by open positions
    pub fn available(&self) -> Decimal {
        self.bankroll - self.committed
    }

    /// Resolved wins and losses, excluding force-closed positions
    pub fn total_resolved(&self) -> u64 {
        self.resolved_positions
            .iter()
            .filter(|p| p.won().is_some())
            .count() as u64
    }

    /// Win rate over the last `window` resolutions
    pub fn rolling_win_rate(&self, window: usize) -> Option<Decimal> {
        let outcomes: Vec<bool> = self
            .resolved_positions
            .iter()
            .rev()
            .filter_map(Position::won)
            .take(window)
            .collect();
        if outcomes.is_empty() {
            return None;
        }
        let wins = outcomes.iter().filter(|w| **w).count();
        Some(Decimal::from(wins) / Decimal::from(outcomes.len()))
    }

    pub fn position(&self, id: Uuid) -> Option<&Position> {
        self.open_positions
            .iter()
            .chain(self.resolved_positions.iter())
            .find(|p| p.id == id)
    }

    /// Read-only snapshot for admission checks
    pub fn view(&self, limits: &PortfolioLimits, rolling_window: usize) -> PortfolioView {
        let mut group_counts = HashMap::new();
        for position in &self.open_positions {
            *group_counts.entry(position.correlation_group).or_insert(0) += 1;
        }

        PortfolioView {
            bankroll: self.bankroll,
            available: self.available(),
            peak_bankroll: self.peak_bankroll,
            drawdown_pct: self.drawdown_pct,
            open_count: self.open_positions.len(),
            group_counts,
            open_markets: self
                .open_positions
                .iter()
                .map(|p| p.market_id.clone())
                .collect(),
            total_resolved: self.total_resolved(),
            rolling_win_rate: self.rolling_win_rate(rolling_window),
            limits: limits.clone(),
        }
    }

    /// Open a position for an accepted signal after re-checking every cap
    pub fn open(
        &mut self,
        signal: &Signal,
        limits: &PortfolioLimits,
        now: DateTime<Utc>,
    ) -> Result<Position, LedgerError> {
        if !signal.is_accepted() {
            return Err(LedgerError::NotAccepted(signal.market_id.clone()));
        }
        if signal.size_usd <= Decimal::ZERO {
            return Err(LedgerError::InvalidSize(signal.size_usd));
        }

        self.view(limits, 0)
            .admit(&signal.market_id, signal.correlation_group, signal.size_usd)?;

        let position = Position {
            id: Uuid::new_v4(),
            market_id: signal.market_id.clone(),
            title: signal.title.clone(),
            side: signal.side,
            entry_price: signal.entry_price,
            size_usd: signal.size_usd,
            opened_at: now,
            status: PositionStatus::Open,
            correlation_group: signal.correlation_group,
            archetype: signal.archetype,
            predicted_confidence: signal.base_confidence,
            price_zone: signal.price_zone,
            duration_bucket: signal.duration_bucket,
            source_readings: signal.source_readings.clone(),
            closed_at: None,
            pnl: None,
            close_reason: None,
        };

        self.committed += position.size_usd;
        self.open_positions.push(position.clone());
        Ok(position)
    }

    /// Settle an open position; a void settlement force-closes it
    pub fn resolve(
        &mut self,
        id: Uuid,
        settlement: Settlement,
        now: DateTime<Utc>,
    ) -> Result<Position, LedgerError> {
        let Some(winner) = settlement.winner() else {
            return self.force_close(id, "void_settlement", now);
        };

        let mut position = self.take_open(id)?;
        let pnl = if position.side == winner {
            position.status = PositionStatus::ResolvedWin;
            position.win_profit()
        } else {
            position.status = PositionStatus::ResolvedLoss;
            -position.size_usd
        };

        self.committed -= position.size_usd;
        self.bankroll += pnl;
        self.peak_bankroll = self.peak_bankroll.max(self.bankroll);
        self.drawdown_pct = drawdown(self.peak_bankroll, self.bankroll);

        position.pnl = Some(pnl);
        position.closed_at = Some(now);
        self.resolved_positions.push(position.clone());
        Ok(position)
    }

    /// Close without settlement, releasing the stake with zero pnl
    pub fn force_close(
        &mut self,
        id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Position, LedgerError> {
        let mut position = self.take_open(id)?;
        position.status = PositionStatus::ForceClosed;
        position.pnl = Some(Decimal::ZERO);
        position.closed_at = Some(now);
        position.close_reason = Some(reason.to_string());

        self.committed -= position.size_usd;
        self.resolved_positions.push(position.clone());
        Ok(position)
    }

    fn take_open(&mut self, id: Uuid) -> Result<Position, LedgerError> {
        match self.open_positions.iter().position(|p| p.id == id) {
            Some(index) => Ok(self.open_positions.remove(index)),
            None => match self.resolved_positions.iter().find(|p| p.id == id) {
                Some(done) => Err(LedgerError::AlreadyTerminal {
                    id,
                    status: done.status,
                }),
                None => Err(LedgerError::UnknownPosition(id)),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::accepted_signal;
    use super::*;
    use crate::portfolio::CorrelationGroup;
    use rust_decimal_macros::dec;

    fn limits() -> PortfolioLimits {
        PortfolioLimits::default()
    }

    #[test]
    fn test_open_reserves_stake() {
        let mut state = PortfolioState::new(dec!(1000));
        let signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        let position = state.open(&signal, &limits(), Utc::now()).unwrap();

        assert_eq!(position.status, PositionStatus::Open);
        assert_eq!(state.committed, dec!(100));
        assert_eq!(state.available(), dec!(900));
        assert_eq!(state.bankroll, dec!(1000));
    }

    #[test]
    fn test_win_credits_payout() {
        let mut state = PortfolioState::new(dec!(1000));
        let signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        let id = state.open(&signal, &limits(), Utc::now()).unwrap().id;

        let done = state.resolve(id, Settlement::Yes, Utc::now()).unwrap();
        assert_eq!(done.status, PositionStatus::ResolvedWin);
        // 100 / 0.40 - 100
        assert_eq!(done.pnl, Some(dec!(150)));
        assert_eq!(state.bankroll, dec!(1150));
        assert_eq!(state.peak_bankroll, dec!(1150));
        assert_eq!(state.committed, dec!(0));
        assert_eq!(state.drawdown_pct, dec!(0));
    }

    #[test]
    fn test_loss_debits_stake_and_tracks_drawdown() {
        let mut state = PortfolioState::new(dec!(1000));
        let signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        let id = state.open(&signal, &limits(), Utc::now()).unwrap().id;

        state.resolve(id, Settlement::No, Utc::now()).unwrap();
        assert_eq!(state.bankroll, dec!(900));
        assert_eq!(state.peak_bankroll, dec!(1000));
        assert_eq!(state.drawdown_pct, dec!(0.1));
        assert_eq!(state.rolling_win_rate(10), Some(dec!(0)));
    }

    #[test]
    fn test_terminal_is_final() {
        let mut state = PortfolioState::new(dec!(1000));
        let signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        let id = state.open(&signal, &limits(), Utc::now()).unwrap().id;
        state.resolve(id, Settlement::Yes, Utc::now()).unwrap();

        let before = state.clone();
        for settlement in [Settlement::Yes, Settlement::No, Settlement::Void] {
            let err = state.resolve(id, settlement, Utc::now()).unwrap_err();
            assert!(matches!(
                err,
                LedgerError::AlreadyTerminal {
                    status: PositionStatus::ResolvedWin,
                    ..
                }
            ));
        }
        assert!(state.force_close(id, "manual", Utc::now()).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_void_force_closes() {
        let mut state = PortfolioState::new(dec!(1000));
        let signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        let id = state.open(&signal, &limits(), Utc::now()).unwrap().id;

        let done = state.resolve(id, Settlement::Void, Utc::now()).unwrap();
        assert_eq!(done.status, PositionStatus::ForceClosed);
        assert_eq!(done.pnl, Some(dec!(0)));
        assert_eq!(done.close_reason.as_deref(), Some("void_settlement"));
        assert_eq!(state.bankroll, dec!(1000));
        assert_eq!(state.committed, dec!(0));
        assert_eq!(state.total_resolved(), 0);
    }

    #[test]
    fn test_fourth_in_group_is_refused() {
        let mut state = PortfolioState::new(dec!(10000));
        for i in 0..3 {
            let s = accepted_signal(&format!("c{}", i), CorrelationGroup::Crypto, dec!(0.5), dec!(100));
            state.open(&s, &limits(), Utc::now()).unwrap();
        }
        let before = state.open_positions.clone();

        let fourth = accepted_signal("c3", CorrelationGroup::Crypto, dec!(0.5), dec!(100));
        let err = state.open(&fourth, &limits(), Utc::now()).unwrap_err();
        assert_eq!(err.reject_reason().unwrap().code(), "correlation_cap_exceeded");
        assert_eq!(state.open_positions, before);
        assert_eq!(state.committed, dec!(300));
    }

    #[test]
    fn test_rejected_signal_cannot_open() {
        let mut state = PortfolioState::new(dec!(1000));
        let mut signal = accepted_signal("m1", CorrelationGroup::Crypto, dec!(0.40), dec!(100));
        signal.decision = crate::signal::Decision::Reject;
        assert!(matches!(
            state.open(&signal, &limits(), Utc::now()),
            Err(LedgerError::NotAccepted(_))
        ));
    }

    #[test]
    fn test_unknown_position() {
        let mut state = PortfolioState::new(dec!(1000));
        assert!(matches!(
            state.resolve(Uuid::new_v4(), Settlement::Yes, Utc::now()),
            Err(LedgerError::UnknownPosition(_))
        ));
    }
}
