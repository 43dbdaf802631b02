//! Per-conversation context store with a pluggable persistence hook.
//!
//! The store owns exactly one [`WeatherContext`]. Persistence is a
//! capability, not a requirement: with no backend configured the store is
//! purely in-memory and every operation still succeeds. A persisted
//! snapshot is only restored when it is fresh (within the 24h expiry
//! window) and structurally valid; anything else is discarded.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};

use sky_domain::context::{ContextUpdate, WeatherContext};
use sky_domain::error::{Error, Result};

/// Age past which a persisted snapshot is stale and ignored on load.
pub const SNAPSHOT_MAX_AGE_HOURS: i64 = 24;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persistence capability
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub trait ContextPersistence: Send + Sync {
    fn load(&self) -> Result<Option<WeatherContext>>;
    fn save(&self, context: &WeatherContext) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-memory-only mode: loads nothing, saves nowhere, never fails.
pub struct NoopPersistence;

impl ContextPersistence for NoopPersistence {
    fn load(&self) -> Result<Option<WeatherContext>> {
        Ok(None)
    }

    fn save(&self, _context: &WeatherContext) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// JSON snapshot under one well-known file in the state directory.
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("context.json"),
        }
    }
}

impl ContextPersistence for FilePersistence {
    fn load(&self) -> Result<Option<WeatherContext>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path).map_err(Error::Io)?;
        // A snapshot that no longer matches the schema is dropped, not fatal.
        match serde_json::from_str(&raw) {
            Ok(context) => Ok(Some(context)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable context snapshot");
                Ok(None)
            }
        }
    }

    fn save(&self, context: &WeatherContext) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(Error::Io)?;
        }
        let json = serde_json::to_string_pretty(context)?;
        std::fs::write(&self.path, json).map_err(Error::Io)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ContextStore {
    context: WeatherContext,
    persistence: Box<dyn ContextPersistence>,
}

impl ContextStore {
    /// Build a store, restoring a persisted snapshot when one exists and
    /// is fresh enough to trust.
    pub fn initialize(persistence: Box<dyn ContextPersistence>) -> Self {
        let context = match persistence.load() {
            Ok(Some(saved)) => {
                let age = Utc::now() - saved.session.last_activity_time;
                if age > Duration::hours(SNAPSHOT_MAX_AGE_HOURS) {
                    tracing::info!("persisted context older than {SNAPSHOT_MAX_AGE_HOURS}h — starting fresh");
                    WeatherContext::new()
                } else {
                    tracing::debug!(
                        message_count = saved.session.message_count,
                        "restored persisted context"
                    );
                    saved
                }
            }
            Ok(None) => WeatherContext::new(),
            Err(e) => {
                tracing::warn!(error = %e, "context load failed — starting fresh");
                WeatherContext::new()
            }
        };
        Self {
            context,
            persistence,
        }
    }

    /// Merge a partial update and persist the result. A persistence
    /// failure degrades to in-memory-only with a warning.
    pub fn merge(&mut self, update: ContextUpdate) -> &WeatherContext {
        self.context.apply(update);
        if let Err(e) = self.persistence.save(&self.context) {
            tracing::warn!(error = %e, "context save failed — continuing in memory");
        }
        &self.context
    }

    /// Read-only copy of the current aggregate.
    pub fn snapshot(&self) -> WeatherContext {
        self.context.clone()
    }

    pub fn summarize(&self) -> String {
        self.context.summarize()
    }

    /// Back to fresh defaults, dropping any persisted copy.
    pub fn reset(&mut self) {
        self.context = WeatherContext::new();
        if let Err(e) = self.persistence.clear() {
            tracing::warn!(error = %e, "clearing persisted context failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sky_domain::context::LocationData;

    fn tokyo_update() -> ContextUpdate {
        ContextUpdate {
            location: Some(LocationData {
                city: "Tokyo".into(),
                country: "Japan".into(),
                latitude: 35.6762,
                longitude: 139.6503,
                timezone: None,
                confidence: None,
                last_used_at: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn noop_store_works_without_backend() {
        let mut store = ContextStore::initialize(Box::new(NoopPersistence));
        store.merge(tokyo_update());
        assert_eq!(
            store.snapshot().location.current.unwrap().city,
            "Tokyo"
        );
    }

    #[test]
    fn file_persistence_round_trips() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = ContextStore::initialize(Box::new(FilePersistence::new(dir.path())));
        store.merge(tokyo_update());
        drop(store);

        let restored = ContextStore::initialize(Box::new(FilePersistence::new(dir.path())));
        assert_eq!(
            restored.snapshot().location.current.unwrap().city,
            "Tokyo"
        );
    }

    #[test]
    fn stale_snapshot_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = FilePersistence::new(dir.path());

        let mut old = WeatherContext::new();
        old.apply(tokyo_update());
        old.session.last_activity_time = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        persistence.save(&old).unwrap();

        let restored = ContextStore::initialize(Box::new(persistence));
        assert!(restored.snapshot().location.current.is_none());
    }

    #[test]
    fn corrupt_snapshot_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("context.json"), "{not json").unwrap();

        let restored = ContextStore::initialize(Box::new(FilePersistence::new(dir.path())));
        assert_eq!(restored.snapshot().session.message_count, 0);
    }

    #[test]
    fn reset_clears_persisted_copy() {
        let dir = tempfile::tempdir().unwrap();

        let mut store = ContextStore::initialize(Box::new(FilePersistence::new(dir.path())));
        store.merge(tokyo_update());
        store.reset();
        assert!(!dir.path().join("context.json").exists());

        let restored = ContextStore::initialize(Box::new(FilePersistence::new(dir.path())));
        assert!(restored.snapshot().location.current.is_none());
    }
}
