//! Signal pipeline
//!
//! One ordered pass per market snapshot:
//!
//! 1. validate the snapshot
//! 2. classify and resolve the side
//! 3. score confidence; a kill rule rejects with its id
//! 4. minimum edge, then the implied-probability floor
//! 5. Kelly fraction at the operating phase
//! 6. bootstrap haircut, volume spike, momentum, archetype boost
//! 7. ceiling and minimum bet
//! 8. admission against a ledger snapshot
//!
//! Nothing here mutates the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use super::modifiers::{
    self, archetype_boost, momentum, scale, volume_spike, Momentum, SourceWeights,
};
use super::types::{Decision, Modifier, RejectReason, Signal, SourceReading, ACCEPTED};
use crate::classifier::Classifier;
use crate::config::{Config, SignalConfig, SizingConfig};
use crate::confidence::ConfidenceEngine;
use crate::market::{HistorySample, MarketSnapshot};
use crate::portfolio::{LedgerError, PortfolioView};
use crate::risk::{
    phase_fraction, select_phase, KellyCalculator, PhaseInputs, PositionSizer, SizeDecision,
    UncertaintyHaircut,
};
use crate::telemetry::{self, LatencyMetric};

/// Snapshot in, reason-coded [`Signal`] out
#[derive(Debug)]
pub struct SignalPipeline {
    classifier: Classifier,
    engine: Arc<ConfidenceEngine>,
    config: SignalConfig,
    sizing: SizingConfig,
    haircut: UncertaintyHaircut,
    sizer: PositionSizer,
    weights: RwLock<SourceWeights>,
}

impl SignalPipeline {
    pub fn new(engine: Arc<ConfidenceEngine>, config: SignalConfig, sizing: SizingConfig) -> Self {
        Self {
            classifier: Classifier::default(),
            haircut: UncertaintyHaircut::from_config(&sizing),
            sizer: PositionSizer::from_config(&sizing),
            engine,
            config,
            sizing,
            weights: RwLock::new(SourceWeights::default()),
        }
    }

    pub fn from_config(config: &Config, engine: Arc<ConfidenceEngine>) -> Self {
        Self::new(engine, config.signal.clone(), config.sizing.clone())
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn engine(&self) -> &Arc<ConfidenceEngine> {
        &self.engine
    }

    pub fn source_weights(&self) -> SourceWeights {
        self.weights
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the weights derived by calibration
    pub fn set_source_weights(&self, weights: SourceWeights) {
        let mut guard = self.weights.write().unwrap_or_else(|e| e.into_inner());
        *guard = weights;
    }

    /// Evaluate one snapshot against its history and a portfolio snapshot
    pub fn evaluate(
        &self,
        snapshot: &MarketSnapshot,
        history: &[HistorySample],
        portfolio: &PortfolioView,
        now: DateTime<Utc>,
    ) -> Signal {
        let started = Instant::now();
        let signal = self.run(snapshot, history, portfolio, now);
        telemetry::record_latency(LatencyMetric::Evaluation, started.elapsed());

        let decision = if signal.is_accepted() { "accept" } else { "reject" };
        telemetry::record_signal(decision, &signal.reason);
        tracing::debug!(
            market_id = %signal.market_id,
            archetype = %signal.archetype,
            side = %signal.side,
            confidence = %signal.base_confidence,
            edge = %signal.edge,
            size = %signal.size_usd,
            reason = %signal.reason,
            "Signal evaluated"
        );
        signal
    }

    fn run(
        &self,
        snapshot: &MarketSnapshot,
        history: &[HistorySample],
        portfolio: &PortfolioView,
        now: DateTime<Utc>,
    ) -> Signal {
        let classification = self.classifier.classify_snapshot(snapshot);
        let side = classification.hint.resolve(snapshot.yes_price);
        let entry_price = snapshot.price_of(side);

        let mut signal = Signal {
            market_id: snapshot.id.clone(),
            title: snapshot.title.clone(),
            archetype: classification.archetype,
            side,
            entry_price,
            base_confidence: Decimal::ZERO,
            edge: Decimal::ZERO,
            kelly_fraction: Decimal::ZERO,
            size_usd: Decimal::ZERO,
            modifiers_applied: Vec::new(),
            decision: Decision::Reject,
            reason: String::new(),
            correlation_group: classification.group,
            price_zone: None,
            duration_bucket: None,
            source_readings: Vec::new(),
            evaluated_at: now,
        };

        if let Err(e) = snapshot.validate(self.config.price_sum_tolerance, now) {
            return signal.reject(&RejectReason::InvalidMarket(e.code().to_string()));
        }

        let score = self.engine.score(
            classification.archetype,
            side,
            entry_price,
            snapshot.days_to_resolution(now),
        );
        signal.base_confidence = score.confidence;
        signal.price_zone = Some(score.zone);
        signal.duration_bucket = Some(score.duration);
        signal.edge = KellyCalculator::edge(score.confidence, entry_price);
        signal.source_readings.push(SourceReading {
            source: modifiers::EMPIRICAL.to_string(),
            value: score.confidence,
        });

        if let Some(rule) = &score.killed_by {
            return signal.reject(&RejectReason::Killed(rule.clone()));
        }

        let edge = signal.edge;
        if edge < self.config.min_edge {
            return signal.reject(&RejectReason::EdgeBelowMinimum(edge));
        }

        if entry_price < self.config.min_implied_probability {
            return signal.reject(&RejectReason::ImpliedProbabilityBelowFloor(entry_price));
        }

        let phase = select_phase(
            &self.sizing,
            &PhaseInputs {
                total_resolved: portfolio.total_resolved,
                rolling_win_rate: portfolio.rolling_win_rate,
                drawdown: portfolio.drawdown_pct,
            },
        );
        let full = KellyCalculator::full_fraction(score.confidence, entry_price);
        if full <= Decimal::ZERO {
            return signal.reject(&RejectReason::NoKellyEdge);
        }
        let mut fraction = full * phase_fraction(&self.sizing, phase);

        let weights = self.source_weights();
        apply(
            &mut signal,
            &mut fraction,
            modifiers::UNCERTAINTY_HAIRCUT,
            self.haircut.factor(&score, entry_price),
        );

        let spike = volume_spike(history, &self.config);
        if let Some(z) = spike.zscore.and_then(Decimal::from_f64) {
            signal.source_readings.push(SourceReading {
                source: modifiers::VOLUME_SPIKE.to_string(),
                value: z.round_dp(4),
            });
        }
        apply(
            &mut signal,
            &mut fraction,
            modifiers::VOLUME_SPIKE,
            scale(spike.factor, weights.get(modifiers::VOLUME_SPIKE)),
        );

        let drift = momentum(history, side, &self.config);
        if let Some(d) = drift.drift() {
            signal.source_readings.push(SourceReading {
                source: modifiers::MOMENTUM.to_string(),
                value: d,
            });
        }
        if let Momentum::Against(d) = drift {
            if !weights.is_disabled(modifiers::MOMENTUM) {
                signal.kelly_fraction = fraction;
                return signal.reject(&RejectReason::MomentumAgainst(d));
            }
        }
        apply(
            &mut signal,
            &mut fraction,
            modifiers::MOMENTUM,
            scale(drift.factor(), weights.get(modifiers::MOMENTUM)),
        );

        let boost = archetype_boost(classification.archetype, &self.config);
        signal.source_readings.push(SourceReading {
            source: modifiers::ARCHETYPE_BOOST.to_string(),
            value: boost,
        });
        apply(
            &mut signal,
            &mut fraction,
            modifiers::ARCHETYPE_BOOST,
            scale(boost, weights.get(modifiers::ARCHETYPE_BOOST)),
        );

        signal.kelly_fraction = fraction;

        let size = match self.sizer.size(portfolio.bankroll, fraction) {
            SizeDecision::Bet(size) => size,
            SizeDecision::BelowMinimum(size) => {
                return signal.reject(&RejectReason::BelowMinBet(size));
            }
        };
        signal.size_usd = size;

        if let Err(e) = portfolio.admit(&signal.market_id, signal.correlation_group, size) {
            return signal.reject(&admission_reason(&e));
        }

        signal.decision = Decision::Accept;
        signal.reason = ACCEPTED.to_string();
        signal
    }
}

/// Any admission refusal rejects; errors without a pipeline code keep their message
fn admission_reason(error: &LedgerError) -> RejectReason {
    error
        .reject_reason()
        .unwrap_or_else(|| RejectReason::AdmissionRefused(error.to_string()))
}

fn apply(signal: &mut Signal, fraction: &mut Decimal, name: &str, factor: Decimal) {
    *fraction *= factor;
    signal.modifiers_applied.push(Modifier {
        name: name.to_string(),
        factor,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Archetype;
    use crate::confidence::ConfidenceParams;
    use crate::market::test_support::snapshot;
    use crate::portfolio::{CorrelationGroup, PortfolioLimits, PortfolioState};
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn pipeline() -> SignalPipeline {
        SignalPipeline::new(
            Arc::new(ConfidenceEngine::new(ConfidenceParams::seeded())),
            SignalConfig::default(),
            SizingConfig::default(),
        )
    }

    fn view() -> PortfolioView {
        PortfolioState::new(dec!(10000)).view(&PortfolioLimits::default(), 50)
    }

    #[test]
    fn test_accepts_election_no() {
        // Favorite hint at yes 0.45 trades NO at 0.55: 0.85 · 0.92 · 0.94 ≈ 0.735
        let snap = snapshot("e1", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let signal = pipeline().evaluate(&snap, &[], &view(), Utc::now());

        assert_eq!(signal.archetype, Archetype::Election);
        assert_eq!(signal.side, crate::signal::Side::No);
        assert_eq!(signal.entry_price, dec!(0.55));
        assert!(signal.is_accepted(), "reason {}", signal.reason);
        assert_eq!(signal.reason, ACCEPTED);
        assert!(signal.size_usd >= dec!(5) && signal.size_usd <= dec!(500));
        let names: Vec<&str> = signal.modifiers_applied.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["uncertainty_haircut", "volume_spike", "momentum", "archetype_boost"]
        );
    }

    #[test]
    fn test_unclassified_is_killed() {
        let snap = snapshot("x1", "Will the office plant survive?", dec!(0.60), 48);
        let signal = pipeline().evaluate(&snap, &[], &view(), Utc::now());

        assert_eq!(signal.archetype, Archetype::Other);
        assert_eq!(signal.base_confidence, dec!(0));
        assert!(!signal.is_accepted());
        assert_eq!(signal.reason, "unclassified_archetype");
        assert_eq!(signal.size_usd, dec!(0));
    }

    #[test]
    fn test_invalid_and_expired() {
        let mut snap = snapshot("b1", "Will Jane Doe win the 2028 presidential election?", dec!(0.70), 24);
        snap.no_price = dec!(0.50);
        let signal = pipeline().evaluate(&snap, &[], &view(), Utc::now());
        assert_eq!(signal.reason, "invalid_market_state");

        let snap = snapshot("b2", "Will Jane Doe win the 2028 presidential election?", dec!(0.70), -1);
        let signal = pipeline().evaluate(&snap, &[], &view(), Utc::now());
        assert_eq!(signal.reason, "market_expired");
    }

    #[test]
    fn test_thin_edge_rejected() {
        // NO at 0.80 scores 0.85 · 0.80 · 0.94, below its own price
        let snap = snapshot("e2", "Will Jane Doe win the 2028 presidential election?", dec!(0.20), 24 * 20);
        let signal = pipeline().evaluate(&snap, &[], &view(), Utc::now());
        assert_eq!(signal.reason, "edge_below_minimum");
        assert!(signal.edge < dec!(0));
        assert_eq!(signal.size_usd, dec!(0));
    }

    #[test]
    fn test_momentum_against_blocks() {
        // YES climbing from 0.33 to 0.45 is NO falling 0.12
        let snap = snapshot("e3", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let now = Utc::now();
        let history: Vec<HistorySample> = [dec!(0.33), dec!(0.37), dec!(0.41), dec!(0.45)]
            .iter()
            .enumerate()
            .map(|(i, p)| HistorySample {
                timestamp: now - Duration::minutes(30 - i as i64 * 10),
                yes_price: *p,
                volume: dec!(0),
            })
            .collect();

        let p = pipeline();
        let signal = p.evaluate(&snap, &history, &view(), now);
        assert_eq!(signal.reason, "momentum_against");

        let mut weights = SourceWeights::default();
        weights.set(modifiers::MOMENTUM, dec!(0));
        p.set_source_weights(weights);
        let signal = p.evaluate(&snap, &history, &view(), now);
        assert_eq!(signal.modifier(modifiers::MOMENTUM), Some(dec!(1)));
        assert!(signal.is_accepted(), "reason {}", signal.reason);
    }

    #[test]
    fn test_group_cap_rejects_without_mutation() {
        let snap = snapshot("e4", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let mut v = view();
        v.group_counts = HashMap::from([(CorrelationGroup::Politics, 3)]);
        v.open_count = 3;

        let signal = pipeline().evaluate(&snap, &[], &v, Utc::now());
        assert_eq!(signal.reason, "correlation_cap_exceeded");
        assert_eq!(v.group_count(CorrelationGroup::Politics), 3);
    }

    #[test]
    fn test_small_bankroll_below_min_bet() {
        let snap = snapshot("e5", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let v = PortfolioState::new(dec!(20)).view(&PortfolioLimits::default(), 50);
        let signal = pipeline().evaluate(&snap, &[], &v, Utc::now());
        assert_eq!(signal.reason, "below_min_bet");
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let snap = snapshot("e6", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let now = Utc::now();
        let p = pipeline();
        let a = p.evaluate(&snap, &[], &view(), now);
        let b = p.evaluate(&snap, &[], &view(), now);
        assert_eq!(a.size_usd, b.size_usd);
        assert_eq!(a.modifiers_applied, b.modifiers_applied);
    }

    #[test]
    fn test_already_positioned_market_rejected() {
        let snap = snapshot("e7", "Will Jane Doe win the 2028 presidential election?", dec!(0.45), 24 * 20);
        let mut v = view();
        v.open_markets = vec!["e7".to_string()];
        v.open_count = 1;

        let signal = pipeline().evaluate(&snap, &[], &v, Utc::now());
        assert!(!signal.is_accepted());
        assert_eq!(signal.reason, "already_positioned");
    }

    #[test]
    fn test_uncoded_admission_error_still_rejects() {
        let reason = admission_reason(&LedgerError::InvalidSize(dec!(-1)));
        assert_eq!(reason.code(), "admission_refused");

        let coded = admission_reason(&LedgerError::MaxOpenPositions { open: 20, cap: 20 });
        assert_eq!(coded, RejectReason::MaxOpenPositions);
    }
}
