//! Conversational weather context — the typed state carried across turns.
//!
//! One [`WeatherContext`] is owned per conversation and never shared between
//! conversations. Each turn that resolves a location, date, or intent merges
//! a [`ContextUpdate`] into the aggregate; the per-field bounding rules
//! (MRU caps, flow log cap, current-timeframe invariant) live here so every
//! owner of a context — session registry or context store — applies the
//! same semantics.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recent-locations list cap (MRU, deduplicated by city+country).
pub const RECENT_LOCATIONS_CAP: usize = 5;
/// Recent-dates list cap (MRU, deduplicated by date).
pub const RECENT_DATES_CAP: usize = 10;
/// Conversation flow log cap (oldest entries dropped).
pub const FLOW_CAP: usize = 20;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Location
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A resolved place. Identity is the (city, country) pair, case-sensitive
/// as returned by the resolving provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl LocationData {
    /// Same place iff city and country both match exactly.
    pub fn same_place(&self, other: &LocationData) -> bool {
        self.city == other.city && self.country == other.country
    }
}

/// Current location plus the MRU list of recently resolved places.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<LocationData>,
    #[serde(default)]
    pub recent: Vec<LocationData>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Temporal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Classification of a weather query's timeframe. Drives which upstream
/// data source is used and how the answer is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Current,
    Historical,
    Forecast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentDate {
    pub date: NaiveDate,
    pub date_type: Timeframe,
    pub last_used_at: DateTime<Utc>,
}

/// The timeframe state of the conversation.
///
/// Invariant: `current_timeframe == Current` implies `target_date == None`.
/// [`WeatherContext::apply`] enforces this on every merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalContext {
    #[serde(default)]
    pub current_timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub recent_dates: Vec<RecentDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_date_hint: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    Weather,
    Clothing,
    Travel,
    Comparison,
    #[default]
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    Location,
    Date,
    Intent,
}

/// One resolution event in the conversation flow log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEntry {
    pub kind: FlowKind,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    #[serde(default)]
    pub last_query: String,
    #[serde(default)]
    pub query_intent: QueryIntent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_hint: Option<String>,
    #[serde(default)]
    pub flow: Vec<FlowEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Preferences
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Standard,
    Detailed,
}

/// User preferences. Set to defaults at creation and rarely mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub language: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub detail_level: DetailLevel,
    #[serde(default)]
    pub favorite_locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_location: Option<String>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: "en".into(),
            units: Units::Metric,
            detail_level: DetailLevel::Standard,
            favorite_locations: Vec::new(),
            default_location: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Aggregate root
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session activity counters, bumped on every merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
    #[serde(default)]
    pub message_count: u32,
}

/// The full conversational state for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherContext {
    #[serde(default)]
    pub location: LocationContext,
    #[serde(default)]
    pub temporal: TemporalContext,
    #[serde(default)]
    pub conversation: ConversationContext,
    #[serde(default)]
    pub preferences: UserPreferences,
    pub session: SessionMeta,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Partial update
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shallow-merge carrier. `None` fields leave the corresponding
/// sub-record untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalUpdate {
    pub timeframe: Timeframe,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_date_hint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<QueryIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Merge rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl WeatherContext {
    /// Fresh defaults for a conversation starting now.
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    pub fn new_at(now: DateTime<Utc>) -> Self {
        Self {
            location: LocationContext::default(),
            temporal: TemporalContext::default(),
            conversation: ConversationContext::default(),
            preferences: UserPreferences::default(),
            session: SessionMeta {
                start_time: now,
                last_activity_time: now,
                message_count: 0,
            },
        }
    }

    /// Merge a partial update into the aggregate, applying the per-field
    /// bounding rules, and bump the activity counters.
    pub fn apply(&mut self, update: ContextUpdate) {
        self.apply_at(update, Utc::now());
    }

    pub fn apply_at(&mut self, update: ContextUpdate, now: DateTime<Utc>) {
        if let Some(mut loc) = update.location {
            loc.last_used_at = Some(now);
            self.push_flow(FlowKind::Location, format!("{}, {}", loc.city, loc.country), now);
            push_recent_location(&mut self.location.recent, loc.clone());
            self.location.current = Some(loc);
        }

        if let Some(temporal) = update.temporal {
            self.temporal.current_timeframe = temporal.timeframe;
            // Current always means "no specific day".
            self.temporal.target_date = match temporal.timeframe {
                Timeframe::Current => None,
                _ => temporal.target_date,
            };
            self.temporal.relative_date_hint = temporal.relative_date_hint;
            if let Some(date) = self.temporal.target_date {
                push_recent_date(
                    &mut self.temporal.recent_dates,
                    RecentDate {
                        date,
                        date_type: temporal.timeframe,
                        last_used_at: now,
                    },
                );
                self.push_flow(FlowKind::Date, date.to_string(), now);
            }
        }

        if let Some(conv) = update.conversation {
            if let Some(q) = conv.last_query {
                self.conversation.last_query = q;
            }
            if let Some(intent) = conv.intent {
                self.conversation.query_intent = intent;
                self.push_flow(FlowKind::Intent, format!("{intent:?}").to_lowercase(), now);
            }
            if let Some(hint) = conv.follow_up_hint {
                self.conversation.follow_up_hint = Some(hint);
            }
            if let Some(resp) = conv.last_response {
                self.conversation.last_response = Some(resp);
            }
        }

        if let Some(prefs) = update.preferences {
            self.preferences = prefs;
        }

        self.session.last_activity_time = now;
        self.session.message_count += 1;
    }

    fn push_flow(&mut self, kind: FlowKind, value: String, now: DateTime<Utc>) {
        if self.conversation.flow.len() >= FLOW_CAP {
            self.conversation.flow.remove(0);
        }
        self.conversation.flow.push(FlowEntry {
            kind,
            value,
            timestamp: now,
        });
    }

    /// Compact human-readable digest of the current state. Embedded in the
    /// completion preamble as an in-band hint; never parsed programmatically.
    pub fn summarize(&self) -> String {
        let mut parts = Vec::new();
        if let Some(loc) = &self.location.current {
            parts.push(format!("location: {}, {}", loc.city, loc.country));
        }
        match self.temporal.target_date {
            Some(date) => parts.push(format!(
                "timeframe: {:?} ({date})",
                self.temporal.current_timeframe
            )),
            None => parts.push(format!("timeframe: {:?}", self.temporal.current_timeframe)),
        }
        if !self.conversation.last_query.is_empty() {
            parts.push(format!("last query: {}", self.conversation.last_query));
        }
        parts.push(format!("intent: {:?}", self.conversation.query_intent));
        if !self.location.recent.is_empty() {
            let recent: Vec<&str> = self
                .location
                .recent
                .iter()
                .map(|l| l.city.as_str())
                .collect();
            parts.push(format!("recent locations: {}", recent.join(", ")));
        }
        parts.join(" | ").to_lowercase()
    }
}

impl Default for WeatherContext {
    fn default() -> Self {
        Self::new()
    }
}

/// MRU insert, deduplicated by (city, country), capped at
/// [`RECENT_LOCATIONS_CAP`], newest first.
fn push_recent_location(recent: &mut Vec<LocationData>, loc: LocationData) {
    recent.retain(|l| !l.same_place(&loc));
    recent.insert(0, loc);
    recent.truncate(RECENT_LOCATIONS_CAP);
}

/// MRU insert, deduplicated by date, capped at [`RECENT_DATES_CAP`],
/// newest first.
fn push_recent_date(recent: &mut Vec<RecentDate>, entry: RecentDate) {
    recent.retain(|d| d.date != entry.date);
    recent.insert(0, entry);
    recent.truncate(RECENT_DATES_CAP);
}
