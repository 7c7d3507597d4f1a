//! Ordered classification table
//!
//! Rules are evaluated top to bottom and the first match wins, so specific
//! shapes (parlays, intraday up/down) sit above the generic ones they would
//! otherwise fall into.

use rust_decimal::Decimal;

use super::{Archetype, SideHint};

/// A match condition over a normalized title and market metadata
#[derive(Debug)]
pub enum Predicate {
    /// Title contains any of these normalized phrases as whole words
    Phrase(&'static [&'static str]),
    /// Venue category equals one of these (case-insensitive)
    Category(&'static [&'static str]),
    /// Listed lifetime is at most this many days
    ListedWithinDays(u32),
    /// Every predicate matches
    All(&'static [Predicate]),
    /// At least one predicate matches
    Any(&'static [Predicate]),
    Not(&'static Predicate),
}

/// What a predicate sees
#[derive(Debug, Clone)]
pub struct RuleInput<'a> {
    /// Output of [`normalize_title`]
    pub title: &'a str,
    pub category: Option<&'a str>,
    pub listed_days: Option<Decimal>,
}

impl Predicate {
    pub fn matches(&self, input: &RuleInput<'_>) -> bool {
        match self {
            Predicate::Phrase(phrases) => phrases.iter().any(|p| contains_phrase(input.title, p)),
            Predicate::Category(categories) => input
                .category
                .is_some_and(|c| categories.iter().any(|want| c.eq_ignore_ascii_case(want))),
            Predicate::ListedWithinDays(days) => input
                .listed_days
                .is_some_and(|d| d <= Decimal::from(*days)),
            Predicate::All(preds) => preds.iter().all(|p| p.matches(input)),
            Predicate::Any(preds) => preds.iter().any(|p| p.matches(input)),
            Predicate::Not(pred) => !pred.matches(input),
        }
    }
}

/// One row of the table
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: Predicate,
    pub archetype: Archetype,
    pub hint: SideHint,
}

/// Lowercase, split on anything that is not alphanumeric, split digit/letter
/// boundaries ("3PM" -> "3 pm") and pad with spaces for whole-word matching
pub fn normalize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len() + 2);
    out.push(' ');
    let mut prev: Option<char> = None;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if let Some(p) = prev {
                if p.is_alphanumeric() && p.is_ascii_digit() != ch.is_ascii_digit() {
                    out.push(' ');
                }
            }
            out.push(ch);
            prev = Some(ch);
        } else {
            if !out.ends_with(' ') {
                out.push(' ');
            }
            prev = None;
        }
    }

    if !out.ends_with(' ') {
        out.push(' ');
    }
    out
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let mut needle = String::with_capacity(phrase.len() + 2);
    needle.push(' ');
    needle.push_str(phrase);
    needle.push(' ');
    normalized.contains(&needle)
}

/// Crypto assets; also used to place price archetypes in the crypto group
pub const CRYPTO_ASSETS: &[&str] = &[
    "bitcoin", "btc", "ethereum", "eth", "solana", "sol", "xrp", "ripple", "dogecoin", "doge",
    "bnb", "cardano", "ada", "crypto", "hype", "litecoin",
];

const FINANCIAL_ASSETS: &[&str] = &[
    "s p 500", "spx", "spy", "nasdaq", "qqq", "dow jones", "stock", "shares", "tesla", "tsla",
    "nvidia", "nvda", "apple", "aapl", "microsoft", "msft", "gold", "silver", "crude oil", "oil",
    "treasury", "10 year", "yield",
];

const PRICE_LEVEL_WORDS: &[&str] = &[
    "above", "below", "reach", "hit", "dip to", "close above", "close below", "close at",
    "end above", "finish above", "over", "under", "greater than", "less than",
];

const INTRADAY_WORDS: &[&str] = &[
    "am", "pm", "hour", "hourly", "minutes", "minute", "15 m", "1 h", "4 h",
];

const SPORTS_CATEGORIES: &[&str] = &[
    "sports", "nba", "nfl", "mlb", "nhl", "soccer", "football", "tennis", "esports", "mma", "ufc",
];

const MONTHS_AND_HORIZONS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "end of", "year", "q1", "q2", "q3", "q4", "2025", "2026",
    "2027", "2028", "2030",
];

/// The classification table, in priority order
pub static RULES: &[Rule] = &[
    Rule {
        name: "parlay",
        predicate: Predicate::Phrase(&["parlay", "sgp", "multi leg", "all of the following"]),
        archetype: Archetype::Parlay,
        hint: SideHint::No,
    },
    Rule {
        name: "intraday_updown",
        predicate: Predicate::All(&[
            Predicate::Phrase(&["up or down"]),
            Predicate::Phrase(INTRADAY_WORDS),
        ]),
        archetype: Archetype::IntradayUpdown,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "daily_updown",
        predicate: Predicate::Phrase(&["up or down"]),
        archetype: Archetype::DailyUpdown,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "price_range",
        predicate: Predicate::Any(&[
            Predicate::Phrase(&["price range"]),
            Predicate::All(&[
                Predicate::Phrase(&["between"]),
                Predicate::Phrase(CRYPTO_ASSETS),
            ]),
        ]),
        archetype: Archetype::PriceRange,
        hint: SideHint::No,
    },
    Rule {
        name: "financial_price",
        predicate: Predicate::All(&[
            Predicate::Phrase(FINANCIAL_ASSETS),
            Predicate::Phrase(PRICE_LEVEL_WORDS),
        ]),
        archetype: Archetype::FinancialPrice,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "price_above",
        predicate: Predicate::All(&[
            Predicate::Phrase(CRYPTO_ASSETS),
            Predicate::Phrase(PRICE_LEVEL_WORDS),
        ]),
        archetype: Archetype::PriceAbove,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "game_total",
        predicate: Predicate::Phrase(&[
            "over under", "o u", "total points", "total goals", "total runs", "total kills",
            "total maps",
        ]),
        archetype: Archetype::GameTotal,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "election",
        predicate: Predicate::Phrase(&[
            "election", "elected", "nominee", "nomination", "primary", "presidential",
            "president", "senate", "governor", "mayor", "mayoral", "electoral", "popular vote",
            "parliament", "prime minister", "chancellor", "referendum", "vote share",
        ]),
        archetype: Archetype::Election,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "geopolitical",
        predicate: Predicate::Phrase(&[
            "war", "ceasefire", "cease fire", "invade", "invasion", "nato", "sanctions", "missile",
            "military", "troops", "nuclear", "airstrike", "strike on", "treaty", "peace deal",
            "russia", "ukraine", "israel", "iran", "gaza", "china", "taiwan", "north korea",
            "hamas", "putin", "zelensky",
        ]),
        archetype: Archetype::Geopolitical,
        hint: SideHint::No,
    },
    Rule {
        name: "weather",
        predicate: Predicate::Any(&[
            Predicate::Phrase(&[
                "temperature", "hurricane", "tropical storm", "rainfall", "rain", "snow",
                "snowfall", "weather", "heat wave", "tornado", "degrees", "hottest", "coldest",
                "precipitation",
            ]),
            Predicate::Category(&["weather", "climate"]),
        ]),
        archetype: Archetype::Weather,
        hint: SideHint::No,
    },
    Rule {
        name: "social_count",
        predicate: Predicate::Phrase(&[
            "tweets", "tweet", "posts", "followers", "subscribers", "mentions", "retweets",
            "views on",
        ]),
        archetype: Archetype::SocialCount,
        hint: SideHint::No,
    },
    Rule {
        name: "entertainment",
        predicate: Predicate::Any(&[
            Predicate::Phrase(&[
                "box office", "oscar", "oscars", "academy award", "grammy", "grammys", "emmy",
                "emmys", "golden globe", "album", "movie", "film", "netflix", "billboard",
                "spotify", "top song", "rotten tomatoes", "eurovision",
            ]),
            Predicate::Category(&["pop culture", "entertainment", "culture"]),
        ]),
        archetype: Archetype::Entertainment,
        hint: SideHint::No,
    },
    Rule {
        name: "sports_single_game",
        predicate: Predicate::Any(&[
            Predicate::Phrase(&["vs", "versus", "beat", "defeat", "win on", "game 1", "match"]),
            Predicate::All(&[
                Predicate::Category(SPORTS_CATEGORIES),
                Predicate::ListedWithinDays(2),
            ]),
        ]),
        archetype: Archetype::SportsSingleGame,
        hint: SideHint::Favorite,
    },
    Rule {
        name: "sports_winner",
        predicate: Predicate::Any(&[
            Predicate::Phrase(&[
                "win the", "champion", "championship", "super bowl", "nba finals", "finals",
                "world series", "stanley cup", "world cup", "premier league", "champions league",
                "mvp", "title", "playoffs", "ballon d or", "grand slam", "wimbledon",
            ]),
            Predicate::Category(SPORTS_CATEGORIES),
        ]),
        archetype: Archetype::SportsWinner,
        hint: SideHint::No,
    },
    Rule {
        name: "deadline_binary",
        predicate: Predicate::All(&[
            Predicate::Phrase(&["by", "before"]),
            Predicate::Phrase(MONTHS_AND_HORIZONS),
        ]),
        archetype: Archetype::DeadlineBinary,
        hint: SideHint::No,
    },
    Rule {
        name: "directional",
        predicate: Predicate::Phrase(&[
            "higher", "lower", "increase", "decrease", "rise", "rises", "fall", "falls", "drop",
            "grow", "decline",
        ]),
        archetype: Archetype::Directional,
        hint: SideHint::Favorite,
    },
];
