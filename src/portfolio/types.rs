//! Portfolio types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::classifier::Archetype;
use crate::confidence::{DurationBucket, PriceZone};
use crate::config::PortfolioConfig;
use crate::signal::{RejectReason, Side, SourceReading};
use crate::store::StoreError;

/// Coarse bucket of related outcomes sharing an exposure cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationGroup {
    Crypto,
    Politics,
    Geopolitical,
    Sports,
    Weather,
    Culture,
    Finance,
    Other,
}

impl CorrelationGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationGroup::Crypto => "crypto",
            CorrelationGroup::Politics => "politics",
            CorrelationGroup::Geopolitical => "geopolitical",
            CorrelationGroup::Sports => "sports",
            CorrelationGroup::Weather => "weather",
            CorrelationGroup::Culture => "culture",
            CorrelationGroup::Finance => "finance",
            CorrelationGroup::Other => "other",
        }
    }
}

impl fmt::Display for CorrelationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position lifecycle; every state but `Open` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    Open,
    ResolvedWin,
    ResolvedLoss,
    ForceClosed,
}

impl PositionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PositionStatus::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::ResolvedWin => "resolved_win",
            PositionStatus::ResolvedLoss => "resolved_loss",
            PositionStatus::ForceClosed => "force_closed",
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bet held by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub market_id: String,
    pub title: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub size_usd: Decimal,
    pub opened_at: DateTime<Utc>,
    pub status: PositionStatus,
    pub correlation_group: CorrelationGroup,
    pub archetype: Archetype,
    /// Engine confidence when the bet was placed
    pub predicted_confidence: Decimal,
    pub price_zone: Option<PriceZone>,
    pub duration_bucket: Option<DurationBucket>,
    #[serde(default)]
    pub source_readings: Vec<SourceReading>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pnl: Option<Decimal>,
    #[serde(default)]
    pub close_reason: Option<String>,
}

impl Position {
    /// Whether a resolved position paid out; `None` while open or force-closed
    pub fn won(&self) -> Option<bool> {
        match self.status {
            PositionStatus::ResolvedWin => Some(true),
            PositionStatus::ResolvedLoss => Some(false),
            _ => None,
        }
    }

    /// Payout profit on a win: shares bought minus stake
    pub fn win_profit(&self) -> Decimal {
        if self.entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.size_usd / self.entry_price - self.size_usd
    }
}

/// Caps enforced on every open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioLimits {
    pub max_open_positions: usize,
    pub default_group_cap: usize,
    pub group_caps: HashMap<CorrelationGroup, usize>,
}

impl PortfolioLimits {
    pub fn from_config(config: &PortfolioConfig) -> Self {
        Self {
            max_open_positions: config.max_open_positions,
            default_group_cap: config.default_group_cap,
            group_caps: config.group_caps.clone(),
        }
    }

    pub fn group_cap(&self, group: CorrelationGroup) -> usize {
        self.group_caps
            .get(&group)
            .copied()
            .unwrap_or(self.default_group_cap)
    }
}

impl Default for PortfolioLimits {
    fn default() -> Self {
        Self::from_config(&PortfolioConfig::default())
    }
}

/// Ledger refusals and failures
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("correlation group {group} already holds {open} of {cap} positions")]
    CorrelationCapExceeded {
        group: CorrelationGroup,
        open: usize,
        cap: usize,
    },
    #[error("{open} positions open, cap is {cap}")]
    MaxOpenPositions { open: usize, cap: usize },
    #[error("a position on market {0} is already open")]
    AlreadyPositioned(String),
    #[error("need {required} but only {available} is uncommitted")]
    InsufficientBankroll {
        required: Decimal,
        available: Decimal,
    },
    #[error("signal for {0} was not accepted")]
    NotAccepted(String),
    #[error("invalid position size {0}")]
    InvalidSize(Decimal),
    #[error("unknown position {0}")]
    UnknownPosition(Uuid),
    #[error("position {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: PositionStatus },
    #[error("state persistence failed: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Matching pipeline rejection for admission refusals
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            LedgerError::CorrelationCapExceeded { group, .. } => {
                Some(RejectReason::CorrelationCapExceeded(*group))
            }
            LedgerError::MaxOpenPositions { .. } => Some(RejectReason::MaxOpenPositions),
            LedgerError::AlreadyPositioned(_) => Some(RejectReason::AlreadyPositioned),
            LedgerError::InsufficientBankroll { available, .. } => {
                Some(RejectReason::InsufficientBankroll(*available))
            }
            _ => None,
        }
    }
}

/// Read-only snapshot of the ledger used by the pipeline's admission check
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub bankroll: Decimal,
    pub available: Decimal,
    pub peak_bankroll: Decimal,
    pub drawdown_pct: Decimal,
    pub open_count: usize,
    pub group_counts: HashMap<CorrelationGroup, usize>,
    pub open_markets: Vec<String>,
    pub total_resolved: u64,
    /// Win rate over the most recent resolutions; `None` before any
    pub rolling_win_rate: Option<Decimal>,
    pub limits: PortfolioLimits,
}

impl PortfolioView {
    pub fn group_count(&self, group: CorrelationGroup) -> usize {
        self.group_counts.get(&group).copied().unwrap_or(0)
    }

    /// Would a new position of `size` on `market_id` fit every cap?
    pub fn admit(
        &self,
        market_id: &str,
        group: CorrelationGroup,
        size: Decimal,
    ) -> Result<(), LedgerError> {
        let cap = self.limits.group_cap(group);
        let open_in_group = self.group_count(group);
        if open_in_group >= cap {
            return Err(LedgerError::CorrelationCapExceeded {
                group,
                open: open_in_group,
                cap,
            });
        }

        if self.open_count >= self.limits.max_open_positions {
            return Err(LedgerError::MaxOpenPositions {
                open: self.open_count,
                cap: self.limits.max_open_positions,
            });
        }

        if self.open_markets.iter().any(|m| m == market_id) {
            return Err(LedgerError::AlreadyPositioned(market_id.to_string()));
        }

        if size > self.available {
            return Err(LedgerError::InsufficientBankroll {
                required: size,
                available: self.available,
            });
        }

        Ok(())
    }
}
