//! Context resolver — the per-turn decision of whether a query already
//! names a place, and whether stored context should be spliced in before
//! the query reaches the completion provider.
//!
//! Deliberately coarse: the provider's own language understanding does
//! the fine-grained resolution. The resolver only has to avoid asking the
//! user to repeat a city they already supplied, and to avoid guessing
//! when no city was ever supplied.

use std::sync::OnceLock;

use regex::Regex;

use sky_domain::chat::Language;
use sky_domain::context::{LocationData, QueryIntent};

/// Outcome of resolving one inbound query.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// True when the query names no place and no stored location exists —
    /// the caller should ask, not guess.
    pub needs_location_input: bool,
    /// Always false: absent an explicit date expression the turn defaults
    /// to the current timeframe, so there is nothing to ask.
    pub needs_time_input: bool,
    /// The query to send upstream — rewritten with the stored city when
    /// the original carried no place of its own.
    pub contextual_query: String,
}

pub fn resolve_query(
    query: &str,
    language: Language,
    stored: Option<&LocationData>,
) -> Resolution {
    if mentions_location(query, language) {
        return Resolution {
            needs_location_input: false,
            needs_time_input: false,
            contextual_query: query.to_string(),
        };
    }

    match stored {
        None => Resolution {
            needs_location_input: true,
            needs_time_input: false,
            contextual_query: query.to_string(),
        },
        Some(loc) => Resolution {
            needs_location_input: false,
            needs_time_input: false,
            contextual_query: splice_city(query, &loc.city, language),
        },
    }
}

/// Rewrite a place-less query with the stored city, in a template the
/// completion provider reads naturally.
fn splice_city(query: &str, city: &str, language: Language) -> String {
    match language {
        Language::En => format!("{query} in {city}"),
        Language::Ja => format!("{city}の{query}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Locative marker test
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// English: a locative preposition and the word it governs. The governed
/// word still has to pass the stopword check — "forecast for tomorrow"
/// names a day, not a place.
fn en_preposition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:in|at|for|near|around)\s+(\p{L}+)").expect("static regex")
    })
}

/// Japanese: a candidate place followed by a locative particle and a
/// weather word, e.g. 「東京の天気」.
fn ja_locative() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([^\s、。]{1,12})[のでに](?:天気|気温|予報|様子)").expect("static regex")
    })
}

/// Common English words that start sentences or name times — a
/// capitalized token in this set is not a place.
const EN_STOPWORDS: &[&str] = &[
    "how", "what", "when", "where", "why", "who", "is", "are", "was", "were", "do", "does",
    "did", "can", "could", "will", "would", "should", "the", "a", "an", "i", "it", "its",
    "my", "we", "you", "please", "tell", "show", "give", "me", "today", "tomorrow",
    "yesterday", "tonight", "now", "this", "that", "weather", "forecast", "temperature",
    "rain", "snow", "sunny", "hot", "cold", "and", "or", "about", "thanks", "hello", "hi",
];

/// Japanese time words that look like the prefix of 「〜の天気」 but
/// name a day, not a place.
const JA_TIME_WORDS: &[&str] = &[
    "今日", "明日", "昨日", "今", "今週", "来週", "週末", "明後日", "一昨日", "今夜", "午後",
];

/// Lightweight lexical test: does this query carry an explicit location
/// reference? Very short inputs never do.
pub fn mentions_location(query: &str, language: Language) -> bool {
    let query = query.trim();
    match language {
        Language::En => {
            if query.len() < 3 {
                return false;
            }
            let governed_place = en_preposition().captures_iter(query).any(|caps| {
                let word = caps.get(1).map_or("", |m| m.as_str());
                !EN_STOPWORDS.contains(&word.to_lowercase().as_str())
            });
            if governed_place {
                return true;
            }
            // A capitalized token that is not ordinary sentence vocabulary
            // reads as a proper noun, e.g. "Tokyo weather".
            query.split_whitespace().any(|token| {
                let word: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
                word.chars().next().is_some_and(|c| c.is_uppercase())
                    && !EN_STOPWORDS.contains(&word.to_lowercase().as_str())
            })
        }
        Language::Ja => {
            if query.chars().count() < 3 {
                return false;
            }
            match ja_locative().captures(query) {
                Some(caps) => {
                    let prefix = caps.get(1).map_or("", |m| m.as_str());
                    !JA_TIME_WORDS.iter().any(|t| prefix.ends_with(t))
                }
                None => false,
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent derivation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Derive the query intent recorded in conversational context after a
/// completed turn. `lookups` is the number of weather lookups the turn
/// performed.
pub fn derive_intent(query: &str, language: Language, lookups: usize) -> QueryIntent {
    if lookups > 1 {
        return QueryIntent::Comparison;
    }
    let lowered = query.to_lowercase();
    let contains_any = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    let (clothing, travel) = match language {
        Language::En => (
            contains_any(&["wear", "clothes", "clothing", "outfit", "jacket", "umbrella"]),
            contains_any(&["travel", "trip", "visit", "vacation", "sightseeing"]),
        ),
        Language::Ja => (
            contains_any(&["服装", "着る", "着て", "傘"]),
            contains_any(&["旅行", "観光", "訪れ"]),
        ),
    };

    if clothing {
        QueryIntent::Clothing
    } else if travel {
        QueryIntent::Travel
    } else if lookups == 1 || contains_any(&["weather", "forecast", "temperature", "天気", "気温", "予報"]) {
        QueryIntent::Weather
    } else {
        QueryIntent::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varanasi() -> LocationData {
        LocationData {
            city: "Varanasi".into(),
            country: "India".into(),
            latitude: 25.3176,
            longitude: 82.9739,
            timezone: None,
            confidence: None,
            last_used_at: None,
        }
    }

    #[test]
    fn short_query_without_location_and_no_context_asks() {
        let r = resolve_query("hi", Language::En, None);
        assert!(r.needs_location_input);
        assert!(!r.needs_time_input);
        assert_eq!(r.contextual_query, "hi");
    }

    #[test]
    fn follow_up_is_rewritten_with_stored_city() {
        let stored = varanasi();
        let r = resolve_query("Tomorrow?", Language::En, Some(&stored));
        assert!(!r.needs_location_input);
        assert!(r.contextual_query.contains("Varanasi"));
    }

    #[test]
    fn explicit_preposition_passes_through() {
        let stored = varanasi();
        let r = resolve_query("weather in Tokyo", Language::En, Some(&stored));
        assert!(!r.needs_location_input);
        assert_eq!(r.contextual_query, "weather in Tokyo");
    }

    #[test]
    fn proper_noun_counts_as_explicit_location() {
        assert!(mentions_location("Tokyo weather", Language::En));
        assert!(!mentions_location("How about yesterday?", Language::En));
        assert!(!mentions_location("Tomorrow?", Language::En));
    }

    #[test]
    fn japanese_place_particle_is_explicit() {
        assert!(mentions_location("東京の天気は？", Language::Ja));
        assert!(!mentions_location("明日の天気は？", Language::Ja));
        assert!(!mentions_location("天気は？", Language::Ja));
    }

    #[test]
    fn japanese_follow_up_is_rewritten() {
        let stored = varanasi();
        let r = resolve_query("明日の天気は？", Language::Ja, Some(&stored));
        assert!(r.contextual_query.starts_with("Varanasi"));
    }

    #[test]
    fn intent_derivation() {
        assert_eq!(
            derive_intent("weather in Tokyo", Language::En, 1),
            QueryIntent::Weather
        );
        assert_eq!(
            derive_intent("what should I wear today", Language::En, 1),
            QueryIntent::Clothing
        );
        assert_eq!(
            derive_intent("Tokyo vs Osaka", Language::En, 2),
            QueryIntent::Comparison
        );
        assert_eq!(
            derive_intent("東京旅行はどう？", Language::Ja, 1),
            QueryIntent::Travel
        );
        assert_eq!(derive_intent("hello there", Language::En, 0), QueryIntent::General);
    }
}
