//! Archetype classification
//!
//! Maps a market title (plus optional category and lifetime metadata) to one
//! archetype from a closed set and a suggested side. The mapping is the
//! ordered table in [`rules`]; nothing here has side effects.

mod rules;

pub use rules::{normalize_title, Predicate, Rule, RuleInput, RULES};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::market::MarketSnapshot;
use crate::portfolio::CorrelationGroup;
use crate::signal::Side;

/// Semantic type of a binary market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    DailyUpdown,
    IntradayUpdown,
    PriceAbove,
    PriceRange,
    SportsWinner,
    SportsSingleGame,
    Election,
    Geopolitical,
    Weather,
    SocialCount,
    Entertainment,
    DeadlineBinary,
    Parlay,
    FinancialPrice,
    GameTotal,
    Directional,
    Other,
}

impl Archetype {
    pub const ALL: [Archetype; 17] = [
        Archetype::DailyUpdown,
        Archetype::IntradayUpdown,
        Archetype::PriceAbove,
        Archetype::PriceRange,
        Archetype::SportsWinner,
        Archetype::SportsSingleGame,
        Archetype::Election,
        Archetype::Geopolitical,
        Archetype::Weather,
        Archetype::SocialCount,
        Archetype::Entertainment,
        Archetype::DeadlineBinary,
        Archetype::Parlay,
        Archetype::FinancialPrice,
        Archetype::GameTotal,
        Archetype::Directional,
        Archetype::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::DailyUpdown => "daily_updown",
            Archetype::IntradayUpdown => "intraday_updown",
            Archetype::PriceAbove => "price_above",
            Archetype::PriceRange => "price_range",
            Archetype::SportsWinner => "sports_winner",
            Archetype::SportsSingleGame => "sports_single_game",
            Archetype::Election => "election",
            Archetype::Geopolitical => "geopolitical",
            Archetype::Weather => "weather",
            Archetype::SocialCount => "social_count",
            Archetype::Entertainment => "entertainment",
            Archetype::DeadlineBinary => "deadline_binary",
            Archetype::Parlay => "parlay",
            Archetype::FinancialPrice => "financial_price",
            Archetype::GameTotal => "game_total",
            Archetype::Directional => "directional",
            Archetype::Other => "other",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggested side before prices are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideHint {
    Yes,
    No,
    /// Whichever side the market prices above one half
    Favorite,
}

impl SideHint {
    /// Resolve against quoted prices; ties go to YES
    pub fn resolve(&self, yes_price: rust_decimal::Decimal) -> Side {
        match self {
            SideHint::Yes => Side::Yes,
            SideHint::No => Side::No,
            SideHint::Favorite => {
                if yes_price >= rust_decimal::Decimal::new(5, 1) {
                    Side::Yes
                } else {
                    Side::No
                }
            }
        }
    }
}

/// Result of classifying one market
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub archetype: Archetype,
    pub hint: SideHint,
    pub group: CorrelationGroup,
    /// Name of the rule that matched, `unmatched` for the fallback
    pub rule: &'static str,
}

/// Table-driven classifier
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    rules: &'static [Rule],
}

impl Default for Classifier {
    fn default() -> Self {
        Self { rules: RULES }
    }
}

impl Classifier {
    /// Use a custom rule table
    pub fn with_rules(rules: &'static [Rule]) -> Self {
        Self { rules }
    }

    /// Classify a title with optional metadata
    pub fn classify(
        &self,
        title: &str,
        category: Option<&str>,
        listed_days: Option<rust_decimal::Decimal>,
    ) -> Classification {
        let normalized = normalize_title(title);
        let input = RuleInput {
            title: &normalized,
            category,
            listed_days,
        };

        let (archetype, hint, rule) = self
            .rules
            .iter()
            .find(|r| r.predicate.matches(&input))
            .map(|r| (r.archetype, r.hint, r.name))
            .unwrap_or((Archetype::Other, SideHint::Favorite, "unmatched"));

        Classification {
            archetype,
            hint,
            group: correlation_group(archetype, &input),
            rule,
        }
    }

    /// Classify a snapshot using its category and listed lifetime
    pub fn classify_snapshot(&self, snapshot: &MarketSnapshot) -> Classification {
        self.classify(
            &snapshot.title,
            snapshot.category.as_deref(),
            Some(snapshot.listed_days()),
        )
    }
}

fn correlation_group(archetype: Archetype, input: &RuleInput<'_>) -> CorrelationGroup {
    match archetype {
        Archetype::DailyUpdown
        | Archetype::IntradayUpdown
        | Archetype::PriceAbove
        | Archetype::PriceRange => {
            if Predicate::Phrase(rules::CRYPTO_ASSETS).matches(input) {
                CorrelationGroup::Crypto
            } else {
                CorrelationGroup::Finance
            }
        }
        Archetype::FinancialPrice | Archetype::Directional => CorrelationGroup::Finance,
        Archetype::Election => CorrelationGroup::Politics,
        Archetype::Geopolitical => CorrelationGroup::Geopolitical,
        Archetype::SportsWinner
        | Archetype::SportsSingleGame
        | Archetype::GameTotal
        | Archetype::Parlay => CorrelationGroup::Sports,
        Archetype::Weather => CorrelationGroup::Weather,
        Archetype::SocialCount | Archetype::Entertainment => CorrelationGroup::Culture,
        Archetype::DeadlineBinary | Archetype::Other => CorrelationGroup::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn classify(title: &str) -> Archetype {
        Classifier::default().classify(title, None, None).archetype
    }

    #[test]
    fn test_fixture_corpus() {
        let corpus = [
            ("Parlay: Chiefs win & Lakers win", Archetype::Parlay),
            ("Ethereum Up or Down - October 18, 3PM ET", Archetype::IntradayUpdown),
            ("Bitcoin Up or Down on October 18?", Archetype::DailyUpdown),
            ("Will the price of Bitcoin be between $60,000 and $62,000 on October 18?", Archetype::PriceRange),
            ("Will Tesla (TSLA) close above $300 on October 24?", Archetype::FinancialPrice),
            ("Will Bitcoin reach $150,000 by December 31?", Archetype::PriceAbove),
            ("Lakers vs. Celtics: O/U 220.5", Archetype::GameTotal),
            ("Will Zohran Mamdani win the NYC mayoral election?", Archetype::Election),
            ("Will China invade Taiwan by 2027?", Archetype::Geopolitical),
            ("Russia x Ukraine ceasefire in 2026?", Archetype::Geopolitical),
            ("Highest temperature in NYC on October 18?", Archetype::Weather),
            ("Elon Musk # of tweets October 17-24?", Archetype::SocialCount),
            ("Will 'One Battle After Another' win Best Picture at the Oscars?", Archetype::Entertainment),
            ("Warriors vs. Lakers", Archetype::SportsSingleGame),
            ("Will the Chiefs win Super Bowl 2027?", Archetype::SportsWinner),
            ("Will OpenAI release GPT-6 by December 31?", Archetype::DeadlineBinary),
            ("Will US unemployment rise in October?", Archetype::Directional),
            ("Will it be announced that aliens exist?", Archetype::Other),
        ];

        for (title, expected) in corpus {
            assert_eq!(classify(title), expected, "title: {title}");
        }
    }

    #[test]
    fn test_deterministic() {
        let classifier = Classifier::default();
        let title = "Bitcoin Up or Down on October 18?";
        let first = classifier.classify(title, None, None);
        for _ in 0..10 {
            assert_eq!(classifier.classify(title, None, None), first);
        }
    }

    #[test]
    fn test_unmatched_is_other() {
        let c = Classifier::default().classify("", None, None);
        assert_eq!(c.archetype, Archetype::Other);
        assert_eq!(c.rule, "unmatched");
        assert_eq!(c.group, CorrelationGroup::Other);
    }

    #[test]
    fn test_category_metadata_routes_short_sports_market() {
        let c = Classifier::default().classify("Chiefs at Bills", Some("nfl"), Some(dec!(1)));
        assert_eq!(c.archetype, Archetype::SportsSingleGame);

        let c = Classifier::default().classify("Chiefs at Bills", Some("nfl"), Some(dec!(30)));
        assert_eq!(c.archetype, Archetype::SportsWinner);
    }

    #[test]
    fn test_correlation_groups() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("Bitcoin Up or Down on October 18?", None, None).group,
            CorrelationGroup::Crypto
        );
        assert_eq!(
            classifier.classify("S&P 500 Up or Down on October 18?", None, None).group,
            CorrelationGroup::Finance
        );
        assert_eq!(
            classifier.classify("Will Zohran Mamdani win the NYC mayoral election?", None, None).group,
            CorrelationGroup::Politics
        );
        assert_eq!(classifier.classify("Warriors vs. Lakers", None, None).group, CorrelationGroup::Sports);
    }

    #[test]
    fn test_side_hint_resolution() {
        assert_eq!(SideHint::Favorite.resolve(dec!(0.70)), Side::Yes);
        assert_eq!(SideHint::Favorite.resolve(dec!(0.30)), Side::No);
        assert_eq!(SideHint::Favorite.resolve(dec!(0.50)), Side::Yes);
        assert_eq!(SideHint::No.resolve(dec!(0.90)), Side::No);
    }

    #[test]
    fn test_archetype_round_trips_through_serde_name() {
        for archetype in Archetype::ALL {
            let json = serde_json::to_string(&archetype).unwrap();
            assert_eq!(json, format!("\"{}\"", archetype.as_str()));
        }
    }
}
