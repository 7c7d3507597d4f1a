//! Concurrent ledger access

mod common;

use common::accepted;
use poly_edge::config::PortfolioConfig;
use poly_edge::market::Settlement;
use poly_edge::portfolio::{CorrelationGroup, Ledger, PortfolioLimits};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

const GROUPS: [CorrelationGroup; 4] = [
    CorrelationGroup::Crypto,
    CorrelationGroup::Politics,
    CorrelationGroup::Sports,
    CorrelationGroup::Weather,
];

fn assert_caps_hold(positions: &[poly_edge::portfolio::Position], limits: &PortfolioLimits) {
    let mut counts: HashMap<CorrelationGroup, usize> = HashMap::new();
    for p in positions {
        *counts.entry(p.correlation_group).or_default() += 1;
    }
    for (group, count) in counts {
        assert!(
            count <= limits.group_cap(group),
            "{} holds {} positions, cap {}",
            group,
            count,
            limits.group_cap(group)
        );
    }
    assert!(positions.len() <= limits.max_open_positions);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opens_never_exceed_group_caps() {
    for seed in 0..20u64 {
        let mut limits = PortfolioLimits::default();
        limits.group_caps.insert(CorrelationGroup::Politics, 2);
        let ledger = Arc::new(Ledger::in_memory(dec!(100000), limits.clone()));

        let mut rng = StdRng::seed_from_u64(seed);
        let signals: Vec<_> = (0..64)
            .map(|i| {
                let group = GROUPS[rng.gen_range(0..GROUPS.len())];
                let size = Decimal::from(rng.gen_range(10..200));
                accepted(&format!("s{}-m{}", seed, i % 40), group, dec!(0.55), size)
            })
            .collect();

        let handles: Vec<_> = signals
            .into_iter()
            .map(|signal| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.open(&signal).await.is_ok() })
            })
            .collect();

        let mut opened = 0;
        for handle in handles {
            if handle.await.unwrap() {
                opened += 1;
            }
        }

        let open = ledger.open_positions().await;
        assert_eq!(open.len(), opened);
        assert_caps_hold(&open, &limits);

        let state = ledger.state().await;
        let reserved: Decimal = open.iter().map(|p| p.size_usd).sum();
        assert_eq!(state.committed, reserved);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_opens_and_resolutions() {
    let limits = PortfolioLimits::default();
    let ledger = Arc::new(Ledger::in_memory(dec!(50000), limits.clone()));
    let mut rng = StdRng::seed_from_u64(7);

    for round in 0..10 {
        let opens: Vec<_> = (0..12)
            .map(|i| {
                let group = GROUPS[rng.gen_range(0..GROUPS.len())];
                let signal = accepted(&format!("r{}-m{}", round, i), group, dec!(0.50), dec!(50));
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    let _ = ledger.open(&signal).await;
                })
            })
            .collect();

        let resolves: Vec<_> = ledger
            .open_positions()
            .await
            .into_iter()
            .map(|p| {
                let settlement = if rng.gen_bool(0.5) { Settlement::Yes } else { Settlement::No };
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move {
                    let _ = ledger.resolve(p.id, settlement).await;
                })
            })
            .collect();

        for handle in opens.into_iter().chain(resolves) {
            handle.await.unwrap();
        }
        assert_caps_hold(&ledger.open_positions().await, &limits);
    }

    let state = ledger.state().await;
    let reserved: Decimal = state.open_positions.iter().map(|p| p.size_usd).sum();
    assert_eq!(state.committed, reserved);
    let realized: Decimal = state.resolved_positions.iter().filter_map(|p| p.pnl).sum();
    assert_eq!(state.bankroll, dec!(50000) + realized);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempdir().unwrap();
    let config = PortfolioConfig {
        state_path: dir.path().join("portfolio.json"),
        ..PortfolioConfig::default()
    };

    let id = {
        let ledger = Ledger::load(&config, 50).unwrap();
        let a = ledger
            .open(&accepted("a", CorrelationGroup::Crypto, dec!(0.40), dec!(100)))
            .await
            .unwrap();
        ledger
            .open(&accepted("b", CorrelationGroup::Crypto, dec!(0.40), dec!(100)))
            .await
            .unwrap();
        ledger.resolve(a.id, Settlement::No).await.unwrap();
        a.id
    };

    let reloaded = Ledger::load(&config, 50).unwrap();
    let state = reloaded.state().await;
    assert_eq!(state.bankroll, config.initial_bankroll - dec!(100));
    assert_eq!(state.committed, dec!(100));
    assert_eq!(state.open_positions.len(), 1);
    assert_eq!(state.resolved_positions[0].id, id);
    assert!(reloaded.resolve(id, Settlement::Yes).await.is_err());
}
