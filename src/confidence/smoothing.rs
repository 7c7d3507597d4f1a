//! Bayesian smoothing toward an archetype prior

use rust_decimal::Decimal;

/// Prior weight from the system-wide resolved-trade count
///
/// The prior is trusted less as data accumulates.
pub fn prior_weight(total_resolved: u64) -> Decimal {
    match total_resolved {
        0..=29 => Decimal::from(10),
        30..=99 => Decimal::from(5),
        100..=299 => Decimal::from(3),
        _ => Decimal::ONE,
    }
}

/// `(p0·w + observed_wr·n) / (w + n)`
///
/// With `n = 0` this is the prior; as `n` grows it tends to the observed rate.
pub fn smooth(prior: Decimal, weight: Decimal, wins: u64, total: u64) -> Decimal {
    let n = Decimal::from(total);
    let denom = weight + n;
    if denom.is_zero() {
        return prior;
    }
    (prior * weight + Decimal::from(wins)) / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prior_weight_schedule() {
        assert_eq!(prior_weight(0), dec!(10));
        assert_eq!(prior_weight(29), dec!(10));
        assert_eq!(prior_weight(30), dec!(5));
        assert_eq!(prior_weight(100), dec!(3));
        assert_eq!(prior_weight(300), dec!(1));
        assert_eq!(prior_weight(10_000), dec!(1));
    }

    #[test]
    fn test_smooth_no_data_is_prior() {
        assert_eq!(smooth(dec!(0.83), dec!(5), 0, 0), dec!(0.83));
    }

    #[test]
    fn test_smooth_scenario() {
        // (0.83·5 + 1.0·2) / 7
        let s = smooth(dec!(0.83), dec!(5), 2, 2);
        assert_eq!(s.round_dp(4), dec!(0.8786));
    }

    #[test]
    fn test_smooth_converges_to_observed() {
        let mut prev_gap = Decimal::MAX;
        for n in [10u64, 100, 1_000, 100_000] {
            let wins = n * 6 / 10;
            let s = smooth(dec!(0.90), dec!(5), wins, n);
            let gap = (s - dec!(0.60)).abs();
            assert!(gap < prev_gap);
            prev_gap = gap;
        }
        assert!(prev_gap < dec!(0.0001));
    }
}
