//! Benchmarks for signal evaluation

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use poly_edge::config::Config;
use poly_edge::confidence::ConfidenceEngine;
use poly_edge::market::{HistorySample, MarketSnapshot, Platform};
use poly_edge::portfolio::{PortfolioLimits, PortfolioState};
use poly_edge::signal::SignalPipeline;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn snapshot(title: &str, yes: Decimal) -> MarketSnapshot {
    let now = Utc::now();
    MarketSnapshot {
        id: "bench".to_string(),
        title: title.to_string(),
        platform: Platform::Polymarket,
        category: None,
        yes_price: yes,
        no_price: Decimal::ONE - yes,
        volume: dec!(50000),
        created_at: now - Duration::days(3),
        expires_at: now + Duration::days(20),
    }
}

fn history(len: usize) -> Vec<HistorySample> {
    let start = Utc::now() - Duration::minutes(len as i64 * 3);
    (0..len)
        .map(|i| HistorySample {
            timestamp: start + Duration::minutes(i as i64 * 3),
            yes_price: dec!(0.45) - Decimal::new(i as i64 % 5, 3),
            volume: Decimal::from(1000 + i as i64 * 25),
        })
        .collect()
}

fn benchmark_evaluate(c: &mut Criterion) {
    let pipeline = SignalPipeline::from_config(&Config::default(), Arc::new(ConfidenceEngine::default()));
    let view = PortfolioState::new(dec!(10000)).view(&PortfolioLimits::default(), 50);
    let snap = snapshot("Will Jane Doe win the 2028 presidential election?", dec!(0.45));
    let samples = history(120);

    c.bench_function("evaluate_accepted", |b| {
        b.iter(|| pipeline.evaluate(black_box(&snap), black_box(&samples), &view, Utc::now()))
    });
}

fn benchmark_evaluate_killed(c: &mut Criterion) {
    let pipeline = SignalPipeline::from_config(&Config::default(), Arc::new(ConfidenceEngine::default()));
    let view = PortfolioState::new(dec!(10000)).view(&PortfolioLimits::default(), 50);
    let snap = snapshot("Will the office plant survive?", dec!(0.60));

    c.bench_function("evaluate_killed", |b| {
        b.iter(|| pipeline.evaluate(black_box(&snap), &[], &view, Utc::now()))
    });
}

criterion_group!(benches, benchmark_evaluate, benchmark_evaluate_killed);
criterion_main!(benches);
