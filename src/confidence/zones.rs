//! Price zones and duration buckets

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Partition of the traded side's entry cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceZone {
    /// Below 0.30
    Longshot,
    /// 0.30 to 0.45
    Underdog,
    /// 0.45 to 0.55
    TossUp,
    /// 0.55 to 0.65
    Lean,
    /// 0.65 to 0.75
    Favorite,
    /// 0.75 to 0.85
    StrongFavorite,
    /// 0.85 and above
    NearLock,
}

impl PriceZone {
    /// Ordered by rising entry cost
    pub const ALL: [PriceZone; 7] = [
        PriceZone::Longshot,
        PriceZone::Underdog,
        PriceZone::TossUp,
        PriceZone::Lean,
        PriceZone::Favorite,
        PriceZone::StrongFavorite,
        PriceZone::NearLock,
    ];

    pub fn from_price(price: Decimal) -> Self {
        if price < dec!(0.30) {
            PriceZone::Longshot
        } else if price < dec!(0.45) {
            PriceZone::Underdog
        } else if price < dec!(0.55) {
            PriceZone::TossUp
        } else if price < dec!(0.65) {
            PriceZone::Lean
        } else if price < dec!(0.75) {
            PriceZone::Favorite
        } else if price < dec!(0.85) {
            PriceZone::StrongFavorite
        } else {
            PriceZone::NearLock
        }
    }

    /// Seed modifiers; calibration replaces them from resolved outcomes
    pub fn seed_modifiers() -> BTreeMap<PriceZone, Decimal> {
        BTreeMap::from([
            (PriceZone::Longshot, dec!(1.08)),
            (PriceZone::Underdog, dec!(1.04)),
            (PriceZone::TossUp, dec!(1.00)),
            (PriceZone::Lean, dec!(0.92)),
            (PriceZone::Favorite, dec!(0.83)),
            (PriceZone::StrongFavorite, dec!(0.80)),
            (PriceZone::NearLock, dec!(0.78)),
        ])
    }
}

/// Force zone modifiers to be non-increasing as entry cost rises
///
/// Each zone takes the minimum of itself and every cheaper zone.
pub fn enforce_monotonic(modifiers: &mut BTreeMap<PriceZone, Decimal>) {
    let mut running: Option<Decimal> = None;
    for zone in PriceZone::ALL {
        if let Some(value) = modifiers.get_mut(&zone) {
            let capped = match running {
                Some(r) => (*value).min(r),
                None => *value,
            };
            *value = capped;
            running = Some(capped);
        }
    }
}

/// Partition of days to resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationBucket {
    /// Under one day
    SameDay,
    /// 1 to 3 days
    Short,
    /// 3 to 8 days
    Weekly,
    /// 8 to 15 days
    Biweekly,
    /// 15 to 35 days
    Monthly,
    Longer,
}

impl DurationBucket {
    pub const ALL: [DurationBucket; 6] = [
        DurationBucket::SameDay,
        DurationBucket::Short,
        DurationBucket::Weekly,
        DurationBucket::Biweekly,
        DurationBucket::Monthly,
        DurationBucket::Longer,
    ];

    pub fn from_days(days: Decimal) -> Self {
        if days < dec!(1) {
            DurationBucket::SameDay
        } else if days < dec!(3) {
            DurationBucket::Short
        } else if days < dec!(8) {
            DurationBucket::Weekly
        } else if days < dec!(15) {
            DurationBucket::Biweekly
        } else if days < dec!(35) {
            DurationBucket::Monthly
        } else {
            DurationBucket::Longer
        }
    }

    /// Seed modifiers relative to the all-duration baseline
    pub fn seed_modifiers() -> BTreeMap<DurationBucket, Decimal> {
        BTreeMap::from([
            (DurationBucket::SameDay, dec!(1.00)),
            (DurationBucket::Short, dec!(1.00)),
            (DurationBucket::Weekly, dec!(0.98)),
            (DurationBucket::Biweekly, dec!(0.96)),
            (DurationBucket::Monthly, dec!(0.94)),
            (DurationBucket::Longer, dec!(0.90)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_boundaries() {
        assert_eq!(PriceZone::from_price(dec!(0.10)), PriceZone::Longshot);
        assert_eq!(PriceZone::from_price(dec!(0.30)), PriceZone::Underdog);
        assert_eq!(PriceZone::from_price(dec!(0.50)), PriceZone::TossUp);
        assert_eq!(PriceZone::from_price(dec!(0.55)), PriceZone::Lean);
        assert_eq!(PriceZone::from_price(dec!(0.70)), PriceZone::Favorite);
        assert_eq!(PriceZone::from_price(dec!(0.80)), PriceZone::StrongFavorite);
        assert_eq!(PriceZone::from_price(dec!(0.85)), PriceZone::NearLock);
        assert_eq!(PriceZone::from_price(dec!(0.99)), PriceZone::NearLock);
    }

    #[test]
    fn test_seed_zone_modifiers_decrease_with_cost() {
        let modifiers = PriceZone::seed_modifiers();
        let values: Vec<_> = PriceZone::ALL.iter().map(|z| modifiers[z]).collect();
        assert!(values.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_enforce_monotonic() {
        let mut modifiers = PriceZone::seed_modifiers();
        modifiers.insert(PriceZone::Favorite, dec!(0.95));
        enforce_monotonic(&mut modifiers);
        assert_eq!(modifiers[&PriceZone::Favorite], dec!(0.92));
        assert_eq!(modifiers[&PriceZone::StrongFavorite], dec!(0.80));
    }

    #[test]
    fn test_duration_buckets() {
        assert_eq!(DurationBucket::from_days(dec!(0.4)), DurationBucket::SameDay);
        assert_eq!(DurationBucket::from_days(dec!(1)), DurationBucket::Short);
        assert_eq!(DurationBucket::from_days(dec!(5)), DurationBucket::Weekly);
        assert_eq!(DurationBucket::from_days(dec!(10)), DurationBucket::Biweekly);
        assert_eq!(DurationBucket::from_days(dec!(30)), DurationBucket::Monthly);
        assert_eq!(DurationBucket::from_days(dec!(120)), DurationBucket::Longer);
    }
}
