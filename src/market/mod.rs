//! Market snapshots and the feeds that supply them
//!
//! A snapshot is one venue's quote for a binary market at fetch time. Later
//! fetches supersede earlier ones by id.

mod history;
mod source;

pub use history::{price_drift, volume_zscore, HistorySample, MarketHistory};
pub use source::{
    FileMarketSource, FileResolutionFeed, HttpMarketSource, HttpResolutionFeed, MarketSource,
    ResolutionFeed, SourceError,
};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::Side;

/// Venue quoting a market
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Polymarket,
    Kalshi,
    Manifold,
    #[serde(other)]
    Unknown,
}

/// A binary market as quoted by one venue at one fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Venue market identifier
    pub id: String,
    /// Market question
    pub title: String,
    /// Quoting venue
    pub platform: Platform,
    /// Venue category, when the venue supplies one
    #[serde(default)]
    pub category: Option<String>,
    /// Price of the YES side
    pub yes_price: Decimal,
    /// Price of the NO side
    pub no_price: Decimal,
    /// Traded volume reported with this fetch
    #[serde(default)]
    pub volume: Decimal,
    /// Listing time
    pub created_at: DateTime<Utc>,
    /// Resolution time
    pub expires_at: DateTime<Utc>,
}

/// Final settlement of a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Settlement {
    /// YES paid out
    Yes,
    /// NO paid out
    No,
    /// Market cancelled or voided by the venue
    Void,
}

impl Settlement {
    /// Winning side, if any
    pub fn winner(&self) -> Option<Side> {
        match self {
            Settlement::Yes => Some(Side::Yes),
            Settlement::No => Some(Side::No),
            Settlement::Void => None,
        }
    }
}

/// Snapshot validation failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MarketError {
    /// A side price outside the open interval (0, 1)
    #[error("price out of range: {0}")]
    PriceOutOfRange(Decimal),
    /// YES + NO too far from 1
    #[error("side prices sum to {0}")]
    PriceSumMismatch(Decimal),
    /// Market already past its resolution time
    #[error("market expired at {0}")]
    Expired(DateTime<Utc>),
}

impl MarketError {
    /// Stable reason code used on rejected signals
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::PriceOutOfRange(_) | MarketError::PriceSumMismatch(_) => {
                "invalid_market_state"
            }
            MarketError::Expired(_) => "market_expired",
        }
    }
}

impl MarketSnapshot {
    /// Check price sanity and expiry
    pub fn validate(&self, sum_tolerance: Decimal, now: DateTime<Utc>) -> Result<(), MarketError> {
        for price in [self.yes_price, self.no_price] {
            if price <= Decimal::ZERO || price >= Decimal::ONE {
                return Err(MarketError::PriceOutOfRange(price));
            }
        }

        let sum = self.yes_price + self.no_price;
        if (sum - Decimal::ONE).abs() > sum_tolerance {
            return Err(MarketError::PriceSumMismatch(sum));
        }

        if self.expires_at <= now {
            return Err(MarketError::Expired(self.expires_at));
        }

        Ok(())
    }

    /// Cost of buying one share of `side`
    pub fn price_of(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes_price,
            Side::No => self.no_price,
        }
    }

    /// Fractional days until resolution, never negative
    pub fn days_to_resolution(&self, now: DateTime<Utc>) -> Decimal {
        let secs = (self.expires_at - now).num_seconds().max(0);
        Decimal::from(secs) / Decimal::from(86_400)
    }

    /// Listed lifetime in days, used as classifier duration metadata
    pub fn listed_days(&self) -> Decimal {
        let secs = (self.expires_at - self.created_at).num_seconds().max(0);
        Decimal::from(secs) / Decimal::from(86_400)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Duration;

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
}
