//! Portfolio ledger
//!
//! Bankroll, open and resolved positions, correlation and concurrency caps.
//! All mutation goes through [`Ledger`].

mod ledger;
mod state;
mod types;

pub use ledger::Ledger;
pub use state::PortfolioState;
pub use types::{
    CorrelationGroup, LedgerError, PortfolioLimits, PortfolioView, Position, PositionStatus,
};

#[cfg(test)]
pub(crate) use state::test_support;
