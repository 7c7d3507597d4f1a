//! Rolling per-market price and volume history
//!
//! Accumulated from successive snapshots; feeds the volume-spike and
//! price-momentum modifiers.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::MarketSnapshot;
use crate::signal::Side;

/// One observation of a market
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    pub yes_price: Decimal,
    /// Cumulative volume as reported by the venue
    pub volume: Decimal,
}

impl HistorySample {
    fn price_of(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_price,
            Side::No => Decimal::ONE - self.yes_price,
        }
    }
}

/// Rolling history keyed by market id
#[derive(Debug)]
pub struct MarketHistory {
    window: Duration,
    max_samples: usize,
    markets: HashMap<String, VecDeque<HistorySample>>,
}

impl MarketHistory {
    /// Create a history that keeps samples younger than `window`
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            window,
            max_samples,
            markets: HashMap::new(),
        }
    }

    /// Record a snapshot observed at `now`
    pub fn record(&mut self, snapshot: &MarketSnapshot, now: DateTime<Utc>) {
        let samples = self.markets.entry(snapshot.id.clone()).or_default();
        samples.push_back(HistorySample {
            timestamp: now,
            yes_price: snapshot.yes_price,
            volume: snapshot.volume,
        });

        let cutoff = now - self.window;
        while let Some(front) = samples.front() {
            if front.timestamp < cutoff || samples.len() > self.max_samples {
                samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Samples for a market, oldest first
    pub fn samples(&self, market_id: &str) -> Vec<HistorySample> {
        self.markets
            .get(market_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop markets with no sample newer than the window
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        self.markets
            .retain(|_, samples| samples.back().is_some_and(|s| s.timestamp >= cutoff));
    }

    /// Number of tracked markets
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Z-score of the latest volume increment against the earlier increments
///
/// Returns `None` until at least `min_increments` earlier increments exist or
/// when the earlier increments have zero variance.
pub fn volume_zscore(samples: &[HistorySample], min_increments: usize) -> Option<f64> {
    let increments: Vec<f64> = samples
        .windows(2)
        .map(|w| {
            let delta: f64 = (w[1].volume - w[0].volume).try_into().unwrap_or(0.0);
            delta.max(0.0)
        })
        .collect();

    let (latest, earlier) = increments.split_last()?;
    if earlier.len() < min_increments {
        return None;
    }

    let n = earlier.len() as f64;
    let mean = earlier.iter().sum::<f64>() / n;
    let variance = earlier.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return None;
    }

    Some((latest - mean) / std_dev)
}

/// Change in the traded side's price over the trailing `lookback`
///
/// Positive means the market is moving toward `side`.
pub fn price_drift(samples: &[HistorySample], side: Side, lookback: Duration) -> Option<Decimal> {
    let latest = samples.last()?;
    let start = latest.timestamp - lookback;
    let anchor = samples.iter().find(|s| s.timestamp >= start)?;
    if anchor.timestamp == latest.timestamp {
        return None;
    }
    Some(latest.price_of(side) - anchor.price_of(side))
}
