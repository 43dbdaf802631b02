//! Keyed store of per-conversation contexts with sliding expiration.
//!
//! Correctness never depends on the periodic sweep: `get` and `update`
//! evict lazily on access, so an expired session is indistinguishable from
//! a missing one. Unknown or expired identifiers yield `None` — callers
//! fall back to stateless behavior, they never fail the turn.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use sky_domain::context::{
    ContextUpdate, ConversationUpdate, LocationData, TemporalUpdate, WeatherContext,
};

/// One tracked conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub context: WeatherContext,
    pub last_activity_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Slide the expiration window forward from `now`.
    fn touch(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.last_activity_time = now;
        self.expires_at = now + ttl;
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Listing shape for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub message_count: u32,
    pub last_activity_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionRegistry {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new(ttl_hours: u32) -> Self {
        Self::with_ttl(Duration::hours(ttl_hours as i64))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh session under a new opaque identifier.
    pub fn create(&self, seed: Option<ContextUpdate>) -> Session {
        self.create_at(seed, Utc::now())
    }

    fn create_at(&self, seed: Option<ContextUpdate>, now: DateTime<Utc>) -> Session {
        let mut context = WeatherContext::new_at(now);
        if let Some(seed) = seed {
            context.apply_at(seed, now);
        }
        let session = Session {
            session_id: uuid::Uuid::new_v4().to_string(),
            context,
            last_activity_time: now,
            expires_at: now + self.ttl,
        };
        tracing::info!(session_id = %session.session_id, "session created");
        self.sessions
            .write()
            .insert(session.session_id.clone(), session.clone());
        session
    }

    /// Look up a session, sliding its expiry. An entry past `expires_at`
    /// is purged and reported as missing.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.get_at(session_id, Utc::now())
    }

    fn get_at(&self, session_id: &str, now: DateTime<Utc>) -> Option<Session> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(session) if session.expired(now) => {
                tracing::debug!(session_id, "evicting expired session on access");
                sessions.remove(session_id);
                None
            }
            Some(session) => {
                session.touch(now, self.ttl);
                Some(session.clone())
            }
            None => None,
        }
    }

    /// Merge a partial update into the session's context, bump its
    /// activity counters, and slide the expiry.
    pub fn update(&self, session_id: &str, update: ContextUpdate) -> Option<Session> {
        self.update_at(session_id, update, Utc::now())
    }

    fn update_at(
        &self,
        session_id: &str,
        update: ContextUpdate,
        now: DateTime<Utc>,
    ) -> Option<Session> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(session) if session.expired(now) => {
                sessions.remove(session_id);
                None
            }
            Some(session) => {
                session.context.apply_at(update, now);
                session.touch(now, self.ttl);
                Some(session.clone())
            }
            None => None,
        }
    }

    // ── Field-specific convenience mutators ───────────────────────

    pub fn update_location(&self, session_id: &str, location: LocationData) -> Option<Session> {
        self.update(
            session_id,
            ContextUpdate {
                location: Some(location),
                ..Default::default()
            },
        )
    }

    pub fn update_temporal(&self, session_id: &str, temporal: TemporalUpdate) -> Option<Session> {
        self.update(
            session_id,
            ContextUpdate {
                temporal: Some(temporal),
                ..Default::default()
            },
        )
    }

    pub fn update_conversation(
        &self,
        session_id: &str,
        conversation: ConversationUpdate,
    ) -> Option<Session> {
        self.update(
            session_id,
            ContextUpdate {
                conversation: Some(conversation),
                ..Default::default()
            },
        )
    }

    /// Replace the session's context with fresh defaults, keeping the
    /// identifier.
    pub fn reset(&self, session_id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(session_id)?;
        session.context = WeatherContext::new_at(now);
        session.touch(now, self.ttl);
        tracing::info!(session_id, "session context reset");
        Some(session.clone())
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .values()
            .map(|s| SessionSummary {
                session_id: s.session_id.clone(),
                message_count: s.context.session.message_count,
                last_activity_time: s.last_activity_time,
                expires_at: s.expires_at,
            })
            .collect()
    }

    /// Advisory housekeeping: drop every entry past its expiry. Returns
    /// the number of sessions removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| !s.expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "session sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn registry() -> SessionRegistry {
        SessionRegistry::with_ttl(Duration::hours(24))
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, h, m, 0).unwrap()
    }

    fn loc(city: &str) -> LocationData {
        LocationData {
            city: city.into(),
            country: "Japan".into(),
            latitude: 35.0,
            longitude: 139.0,
            timezone: None,
            confidence: None,
            last_used_at: None,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let reg = registry();
        let created = reg.create(None);
        let fetched = reg.get(&created.session_id).unwrap();
        assert_eq!(fetched.session_id, created.session_id);
        assert_eq!(fetched.context.session.message_count, 0);
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(registry().get("nope").is_none());
    }

    #[test]
    fn expiry_is_exact_and_sliding() {
        let reg = registry();
        let t0 = at(0, 0);
        let session = reg.create_at(None, t0);
        let id = session.session_id;

        // At exactly expires_at the session is still alive ("never before").
        assert!(reg.get_at(&id, t0 + Duration::hours(24)).is_some());

        // That access slid the window: 47h59m after t0 is still within
        // 24h of the last access.
        assert!(reg
            .get_at(&id, t0 + Duration::hours(47) + Duration::minutes(59))
            .is_some());

        // Let it lapse: one minute past the last recorded expiry.
        let last = reg.get_at(&id, t0 + Duration::hours(48)).unwrap();
        assert!(reg
            .get_at(&id, last.expires_at + Duration::minutes(1))
            .is_none());
        // Lazy eviction purged it for good.
        assert_eq!(reg.len(), 0);
    }

    #[test]
    fn update_merges_and_counts() {
        let reg = registry();
        let id = reg.create(None).session_id;

        let after = reg.update_location(&id, loc("Tokyo")).unwrap();
        assert_eq!(after.context.session.message_count, 1);
        assert_eq!(after.context.location.current.as_ref().unwrap().city, "Tokyo");

        let after = reg.update_location(&id, loc("Osaka")).unwrap();
        assert_eq!(after.context.session.message_count, 2);
        assert_eq!(after.context.location.recent[0].city, "Osaka");
    }

    #[test]
    fn update_on_expired_session_is_none() {
        let reg = registry();
        let t0 = at(0, 0);
        let id = reg.create_at(None, t0).session_id;
        let late = t0 + Duration::hours(25);
        assert!(reg
            .update_at(
                &id,
                ContextUpdate {
                    location: Some(loc("Tokyo")),
                    ..Default::default()
                },
                late
            )
            .is_none());
    }

    #[test]
    fn sweep_removes_only_expired() {
        let reg = registry();
        let t0 = at(0, 0);
        let old = reg.create_at(None, t0).session_id;
        let fresh = reg.create_at(None, t0 + Duration::hours(20)).session_id;

        let removed = reg.sweep_at(t0 + Duration::hours(25));
        assert_eq!(removed, 1);
        assert!(reg.get_at(&fresh, t0 + Duration::hours(25)).is_some());
        assert!(reg.get_at(&old, t0 + Duration::hours(25)).is_none());
    }

    #[test]
    fn reset_keeps_identifier_and_clears_context() {
        let reg = registry();
        let id = reg.create(None).session_id;
        reg.update_location(&id, loc("Tokyo"));

        let reset = reg.reset(&id).unwrap();
        assert_eq!(reset.session_id, id);
        assert!(reset.context.location.current.is_none());
        assert_eq!(reset.context.session.message_count, 0);
    }
}
