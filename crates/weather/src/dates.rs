//! Date classification for the `get_weather` tool's optional `date`
//! argument. Pure — "today" is always passed in so callers (and tests)
//! control the clock.

use chrono::{Duration, NaiveDate};

use sky_domain::context::Timeframe;

/// Outcome of classifying a raw date argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateClassification {
    pub date_type: Timeframe,
    /// `None` exactly when `date_type` is [`Timeframe::Current`].
    pub target_date: Option<NaiveDate>,
}

impl DateClassification {
    fn current() -> Self {
        Self {
            date_type: Timeframe::Current,
            target_date: None,
        }
    }
}

/// Classify the raw `date` argument relative to `today`.
///
/// `"today"`/`"now"` (or nothing) → current; `"tomorrow"` → forecast for
/// today+1; `"yesterday"` → historical for today−1; a strict `YYYY-MM-DD`
/// literal → historical when strictly before today, forecast otherwise.
/// Anything unrecognized falls back to current.
pub fn classify(raw: Option<&str>, today: NaiveDate) -> DateClassification {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r.trim(),
        _ => return DateClassification::current(),
    };

    match raw.to_ascii_lowercase().as_str() {
        "today" | "now" => DateClassification::current(),
        "tomorrow" => DateClassification {
            date_type: Timeframe::Forecast,
            target_date: Some(today + Duration::days(1)),
        },
        "yesterday" => DateClassification {
            date_type: Timeframe::Historical,
            target_date: Some(today - Duration::days(1)),
        },
        _ => match parse_iso_strict(raw) {
            Some(date) if date < today => DateClassification {
                date_type: Timeframe::Historical,
                target_date: Some(date),
            },
            Some(date) => DateClassification {
                date_type: Timeframe::Forecast,
                target_date: Some(date),
            },
            None => DateClassification::current(),
        },
    }
}

/// Parse exactly `YYYY-MM-DD` (ten characters, zero-padded). Looser
/// shapes the model might emit ("2024-1-5", "Jan 5") are rejected and
/// fall back to the current timeframe upstream.
fn parse_iso_strict(s: &str) -> Option<NaiveDate> {
    let b = s.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn absent_and_today_are_current() {
        let today = day(2026, 8, 8);
        for raw in [None, Some("today"), Some("now"), Some(""), Some("  ")] {
            let c = classify(raw, today);
            assert_eq!(c.date_type, Timeframe::Current);
            assert_eq!(c.target_date, None);
        }
    }

    #[test]
    fn tomorrow_is_forecast_plus_one() {
        let c = classify(Some("tomorrow"), day(2026, 8, 8));
        assert_eq!(c.date_type, Timeframe::Forecast);
        assert_eq!(c.target_date, Some(day(2026, 8, 9)));
    }

    #[test]
    fn yesterday_is_historical_minus_one() {
        let c = classify(Some("Yesterday"), day(2026, 8, 8));
        assert_eq!(c.date_type, Timeframe::Historical);
        assert_eq!(c.target_date, Some(day(2026, 8, 7)));
    }

    #[test]
    fn iso_literal_classifies_relative_to_today() {
        // Same literal, different clocks.
        let c = classify(Some("2024-01-15"), day(2025, 6, 1));
        assert_eq!(c.date_type, Timeframe::Historical);
        assert_eq!(c.target_date, Some(day(2024, 1, 15)));

        let c = classify(Some("2024-01-15"), day(2023, 1, 1));
        assert_eq!(c.date_type, Timeframe::Forecast);
        assert_eq!(c.target_date, Some(day(2024, 1, 15)));
    }

    #[test]
    fn today_as_iso_literal_is_forecast() {
        // "Strictly before today" — the boundary day is not historical.
        let c = classify(Some("2026-08-08"), day(2026, 8, 8));
        assert_eq!(c.date_type, Timeframe::Forecast);
    }

    #[test]
    fn unrecognized_input_falls_back_to_current() {
        let today = day(2026, 8, 8);
        for raw in ["next week", "2026-8-8", "08/08/2026", "soon"] {
            let c = classify(Some(raw), today);
            assert_eq!(c.date_type, Timeframe::Current, "input: {raw}");
            assert_eq!(c.target_date, None);
        }
    }
}
