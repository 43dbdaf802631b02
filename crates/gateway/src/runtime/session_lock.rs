//! Per-session turn serialization.
//!
//! Concurrent requests bearing the same session identifier would otherwise
//! race on context updates (last write wins). Each session id maps to a
//! one-permit semaphore; a turn holds the permit for its full duration, so
//! a second request on the same session waits its turn. Distinct sessions
//! never contend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use sky_domain::error::{Error, Result};

pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLocks {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn permit for a session, waiting for any in-flight
    /// turn on the same id to finish. The permit releases on drop.
    pub async fn acquire(&self, session_id: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned()
            .await
            .map_err(|_| Error::Other("session lock closed".into()))
    }

    /// Drop lock entries for sessions with no turn in flight. Run from
    /// the same housekeeping tick as the registry sweep.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_acquire_on_one_session() {
        let locks = SessionLocks::new();
        let p1 = locks.acquire("s1").await.unwrap();
        drop(p1);
        let p2 = locks.acquire("s1").await.unwrap();
        drop(p2);
    }

    #[tokio::test]
    async fn distinct_sessions_do_not_contend() {
        let locks = Arc::new(SessionLocks::new());
        let _p1 = locks.acquire("s1").await.unwrap();
        let _p2 = locks.acquire("s2").await.unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn same_session_waits_for_release() {
        let locks = Arc::new(SessionLocks::new());
        let locks2 = locks.clone();

        let p1 = locks.acquire("s1").await.unwrap();
        let waiter = tokio::spawn(async move {
            let _p2 = locks2.acquire("s1").await.unwrap();
            7
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(p1);
        assert_eq!(waiter.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn prune_drops_idle_entries() {
        let locks = SessionLocks::new();
        let p = locks.acquire("busy").await.unwrap();
        drop(locks.acquire("idle").await.unwrap());

        locks.prune_idle();
        assert_eq!(locks.len(), 1);
        drop(p);
    }
}
