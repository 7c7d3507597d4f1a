//! Shared fixtures for integration tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use poly_edge::classifier::Archetype;
use poly_edge::confidence::{DurationBucket, PriceZone};
use poly_edge::market::{MarketSnapshot, Platform};
use poly_edge::portfolio::CorrelationGroup;
use poly_edge::signal::{Decision, Side, Signal, ACCEPTED};
use rust_decimal::Decimal;

/// An accepted YES signal as the pipeline would emit it
pub fn accepted(market_id: &str, group: CorrelationGroup, entry: Decimal, size: Decimal) -> Signal {
    Signal {
        market_id: market_id.to_string(),
        title: format!("Market {}", market_id),
        archetype: Archetype::DailyUpdown,
        side: Side::Yes,
        entry_price: entry,
        base_confidence: entry + Decimal::new(5, 2),
        edge: Decimal::new(5, 2),
        kelly_fraction: Decimal::new(1, 2),
        size_usd: size,
        modifiers_applied: Vec::new(),
        decision: Decision::Accept,
        reason: ACCEPTED.to_string(),
        correlation_group: group,
        price_zone: Some(PriceZone::from_price(entry)),
        duration_bucket: Some(DurationBucket::SameDay),
        source_readings: Vec::new(),
        evaluated_at: Utc::now(),
    }
}

pub fn snapshot(id: &str, title: &str, yes: Decimal, hours_left: i64) -> MarketSnapshot {
    let now = Utc::now();
    MarketSnapshot {
        id: id.to_string(),
        title: title.to_string(),
        platform: Platform::Polymarket,
        category: None,
        yes_price: yes,
        no_price: Decimal::ONE - yes,
        volume: Decimal::from(1000),
        created_at: now - Duration::hours(1),
        expires_at: now + Duration::hours(hours_left),
    }
}
