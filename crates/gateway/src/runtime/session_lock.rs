//! Per-conversation turn serialization.
//!
//! Only one turn runs per (user, session) pair at a time.  A second message
//! for the same pair waits until the first turn has persisted its reply, so
//! turns never interleave at the agent or in the history.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type LockKey = (String, String);

/// Each (user, session) pair maps to a `Semaphore(1)`; holding the permit
/// grants exclusive access for one turn.
#[derive(Default)]
pub struct SessionLockMap {
    locks: Mutex<HashMap<LockKey, Arc<Semaphore>>>,
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the turn lock of a conversation.  The permit releases on
    /// drop.
    pub async fn acquire(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<OwnedSemaphorePermit, LockClosed> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry((user_id.to_owned(), session_id.to_owned()))
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        if let Ok(permit) = sem.clone().try_acquire_owned() {
            return Ok(permit);
        }
        tracing::debug!(user_id, session_id, "turn in progress, waiting for session lock");
        sem.acquire_owned().await.map_err(|_| LockClosed)
    }

    /// Number of tracked conversations (for monitoring).
    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Forget locks nobody holds or waits on.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
    }
}

/// The lock's semaphore was closed underneath a waiter.
#[derive(Debug)]
pub struct LockClosed;

impl std::fmt::Display for LockClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session lock closed")
    }
}

impl std::error::Error for LockClosed {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();
        drop(map.acquire("1", "s1").await.unwrap());
        drop(map.acquire("1", "s1").await.unwrap());
    }

    #[tokio::test]
    async fn different_pairs_run_concurrently() {
        let map = SessionLockMap::new();
        let _a = map.acquire("1", "s1").await.unwrap();
        let _b = map.acquire("1", "s2").await.unwrap();
        let _c = map.acquire("2", "s1").await.unwrap();
        assert_eq!(map.session_count(), 3);
    }

    #[tokio::test]
    async fn same_pair_waits() {
        let map = Arc::new(SessionLockMap::new());
        let first = map.acquire("1", "s1").await.unwrap();

        let map2 = map.clone();
        let waiter = tokio::spawn(async move {
            let _p = map2.acquire("1", "s1").await.unwrap();
            42
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        drop(first);
        assert_eq!(waiter.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let map = SessionLockMap::new();
        let held = map.acquire("1", "busy").await.unwrap();
        drop(map.acquire("1", "idle").await.unwrap());

        map.prune_idle();
        assert_eq!(map.session_count(), 1);
        drop(held);
        map.prune_idle();
        assert_eq!(map.session_count(), 0);
    }
}
