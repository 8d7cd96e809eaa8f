//! Process-local record of provisioned agent sessions.
//!
//! A hit means the (user, session) pair was confirmed present in the agent
//! session store earlier in this process's lifetime, so the store round
//! trip can be skipped.  Entries never expire; a restart clears them and
//! provisioning simply runs again.

use std::collections::HashSet;

use parking_lot::RwLock;

/// In-memory set of provisioned `(user_id, session_id)` pairs.
#[derive(Default)]
pub struct SessionCache {
    entries: RwLock<HashSet<(String, String)>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this pair has already been provisioned.
    pub fn has(&self, user_id: &str, session_id: &str) -> bool {
        self.entries
            .read()
            .contains(&(user_id.to_owned(), session_id.to_owned()))
    }

    /// Record a successfully provisioned pair.  Returns `false` if it was
    /// already present.
    pub fn mark(&self, user_id: &str, session_id: &str) -> bool {
        self.entries
            .write()
            .insert((user_id.to_owned(), session_id.to_owned()))
    }

    /// Number of cached pairs (for monitoring).
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_then_has() {
        let cache = SessionCache::new();
        assert!(!cache.has("1", "abcd1234"));
        assert!(cache.mark("1", "abcd1234"));
        assert!(cache.has("1", "abcd1234"));
    }

    #[test]
    fn mark_twice_keeps_one_entry() {
        let cache = SessionCache::new();
        cache.mark("1", "s1");
        assert!(!cache.mark("1", "s1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_scoped_by_user() {
        let cache = SessionCache::new();
        cache.mark("1", "s1");
        assert!(!cache.has("2", "s1"));
    }
}
