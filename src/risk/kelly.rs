//! Kelly criterion for binary shares with variable odds

use rust_decimal::Decimal;

/// Kelly calculator for binary outcomes
///
/// A share bought at cost `c` pays 1 on a win, so the payout ratio is
/// `b = (1 - c) / c` and the growth-optimal stake is
/// `f* = (b·p - (1 - p)) / b`. Phase multipliers and the dollar ceiling are
/// applied by the pipeline and [`PositionSizer`](super::PositionSizer).
#[derive(Debug, Clone, Copy)]
pub struct KellyCalculator;

impl KellyCalculator {
    /// Payout ratio for a share costing `cost`
    pub fn payout_ratio(cost: Decimal) -> Option<Decimal> {
        if cost <= Decimal::ZERO || cost >= Decimal::ONE {
            return None;
        }
        Some((Decimal::ONE - cost) / cost)
    }

    /// Full Kelly fraction, never negative
    pub fn full_fraction(p: Decimal, cost: Decimal) -> Decimal {
        let Some(b) = Self::payout_ratio(cost) else {
            return Decimal::ZERO;
        };
        // b·p <= 1 - p exactly when p <= c; decide the sign before dividing
        if p <= cost {
            return Decimal::ZERO;
        }
        let q = Decimal::ONE - p;
        let f = (b * p - q) / b;
        f.max(Decimal::ZERO)
    }

    /// Edge of a bet: confidence minus cost
    pub fn edge(p: Decimal, cost: Decimal) -> Decimal {
        p - cost
    }
}
