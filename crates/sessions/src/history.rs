//! Chat history store.
//!
//! The application's own record of every message exchanged, independent of
//! the agent session store.  Each user's messages live in an append-only
//! `<user_id>.jsonl` file under the history directory; an in-memory
//! write-through cache means a user's file is read at most once per
//! process.  Reads are always scoped to one user.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use wc_domain::error::{Error, Result};
use wc_domain::trace::TraceEvent;

/// Length of the preview produced by [`ChatMessage::snippet`].
const SNIPPET_CHARS: usize = 80;

/// Who authored a history message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Per-user sequence number, starting at 1.  Breaks timestamp ties.
    pub id: u64,
    pub user_id: String,
    pub session_id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Short preview for listings: the first 80 characters, with `...`
    /// appended when the text was cut.
    pub fn snippet(&self) -> String {
        let mut chars = self.text.chars();
        let head: String = chars.by_ref().take(SNIPPET_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }

    fn order(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.id.cmp(&other.id))
    }
}

/// One user's messages plus the counters `append` continues from.
#[derive(Default)]
struct UserLog {
    loaded: bool,
    messages: Vec<ChatMessage>,
    last_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl UserLog {
    fn fill(&mut self, messages: Vec<ChatMessage>) {
        self.last_id = messages.iter().map(|m| m.id).max().unwrap_or(0);
        self.last_timestamp = messages.iter().map(|m| m.timestamp).max();
        self.messages = messages;
        self.loaded = true;
    }

    fn push(&mut self, message: ChatMessage) {
        self.last_id = message.id;
        self.last_timestamp = Some(message.timestamp);
        self.messages.push(message);
    }
}

/// Append-only, per-user message store.
///
/// Each user has their own lock, held across the file write so one user's
/// appends stay ordered without blocking anyone else.
pub struct HistoryStore {
    base_dir: PathBuf,
    users: Mutex<HashMap<String, Arc<tokio::sync::Mutex<UserLog>>>>,
}

impl HistoryStore {
    /// Open (creating if needed) the history directory.
    pub fn open(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir)?;
        tracing::info!(path = %base_dir.display(), "history store ready");
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            users: Mutex::new(HashMap::new()),
        })
    }

    /// Persist one message and return it with its id and timestamp
    /// assigned.  Timestamps never go backwards within a user's history.
    pub async fn append(
        &self,
        user_id: &str,
        session_id: &str,
        role: Role,
        text: &str,
    ) -> Result<ChatMessage> {
        let path = self.user_path(user_id)?;
        let mut log = self.lock_user(user_id, &path).await?;

        let mut timestamp = Utc::now();
        if let Some(last) = log.last_timestamp {
            timestamp = timestamp.max(last);
        }
        let message = ChatMessage {
            id: log.last_id + 1,
            user_id: user_id.to_owned(),
            session_id: session_id.to_owned(),
            role,
            text: text.to_owned(),
            timestamp,
        };

        // Write to disk first; only update the cache if I/O succeeds.
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            file.write_all(line.as_bytes())?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        log.push(message.clone());
        drop(log);

        TraceEvent::HistoryAppend {
            user_id: user_id.to_owned(),
            session_id: session_id.to_owned(),
            role: role.as_str().to_owned(),
            chars: text.chars().count(),
        }
        .emit();

        Ok(message)
    }

    /// All messages of one user in one session, oldest first.
    pub async fn history(&self, user_id: &str, session_id: &str) -> Result<Vec<ChatMessage>> {
        let path = self.user_path(user_id)?;
        let log = self.lock_user(user_id, &path).await?;
        let mut out: Vec<ChatMessage> = log
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        drop(log);
        out.sort_by(ChatMessage::order);
        Ok(out)
    }

    /// Distinct session ids of one user, most recent activity first.
    pub async fn sessions(&self, user_id: &str) -> Result<Vec<String>> {
        let path = self.user_path(user_id)?;
        let log = self.lock_user(user_id, &path).await?;

        let mut latest: HashMap<&str, &ChatMessage> = HashMap::new();
        for m in &log.messages {
            latest
                .entry(m.session_id.as_str())
                .and_modify(|cur| {
                    if m.order(*cur) == Ordering::Greater {
                        *cur = m;
                    }
                })
                .or_insert(m);
        }

        let mut ranked: Vec<&ChatMessage> = latest.into_values().collect();
        ranked.sort_by(|a, b| b.order(a));
        Ok(ranked.into_iter().map(|m| m.session_id.clone()).collect())
    }

    /// Lock one user's log, reading their file on first use.
    async fn lock_user(
        &self,
        user_id: &str,
        path: &Path,
    ) -> Result<tokio::sync::OwnedMutexGuard<UserLog>> {
        let log = self
            .users
            .lock()
            .entry(user_id.to_owned())
            .or_default()
            .clone();
        let mut guard = log.lock_owned().await;
        if !guard.loaded {
            let messages = load_user(path.to_path_buf()).await?;
            guard.fill(messages);
        }
        Ok(guard)
    }

    fn user_path(&self, user_id: &str) -> Result<PathBuf> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Other(format!("invalid history user id: {user_id:?}")));
        }
        Ok(self.base_dir.join(format!("{user_id}.jsonl")))
    }
}

async fn load_user(path: PathBuf) -> Result<Vec<ChatMessage>> {
    tokio::task::spawn_blocking(move || read_jsonl_file(&path))
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))?
}

fn read_jsonl_file(path: &Path) -> Result<Vec<ChatMessage>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ChatMessage>(line) {
            Ok(m) => out.push(m),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = lineno + 1,
                error = %e,
                "skipping malformed history line"
            ),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (HistoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn history_is_chronological_within_session() {
        let (store, _dir) = store();
        store.append("1", "aaaa0001", Role::User, "hi").await.unwrap();
        store.append("1", "aaaa0001", Role::Agent, "hello").await.unwrap();
        store.append("1", "bbbb0002", Role::User, "elsewhere").await.unwrap();
        store.append("1", "aaaa0001", Role::User, "again").await.unwrap();

        let history = store.history("1", "aaaa0001").await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "hello", "again"]);
        assert_eq!(history[1].role, Role::Agent);
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (store, _dir) = store();
        store.append("1", "shared01", Role::User, "mine").await.unwrap();
        store.append("2", "shared01", Role::User, "theirs").await.unwrap();

        let h1 = store.history("1", "shared01").await.unwrap();
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].text, "mine");
        assert_eq!(store.sessions("2").await.unwrap(), vec!["shared01"]);
        assert!(store.history("3", "shared01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sessions_ordered_by_latest_activity() {
        let (store, _dir) = store();
        store.append("1", "first", Role::User, "a").await.unwrap();
        store.append("1", "second", Role::User, "b").await.unwrap();
        store.append("1", "first", Role::Agent, "c").await.unwrap();

        assert_eq!(store.sessions("1").await.unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn reopen_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HistoryStore::open(dir.path()).unwrap();
            store.append("7", "s", Role::User, "q").await.unwrap();
            store.append("7", "s", Role::Agent, "a").await.unwrap();
        }
        let store = HistoryStore::open(dir.path()).unwrap();
        let history = store.history("7", "s").await.unwrap();
        assert_eq!(history.len(), 2);

        let next = store.append("7", "s", Role::User, "q2").await.unwrap();
        assert_eq!(next.id, 3);
        assert!(next.timestamp >= history[1].timestamp);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("9.jsonl"), "garbage\n").unwrap();
        let store = HistoryStore::open(dir.path()).unwrap();
        assert!(store.sessions("9").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn path_like_user_ids_are_rejected() {
        let (store, _dir) = store();
        assert!(store.append("../etc", "s", Role::User, "x").await.is_err());
        assert!(store.history("", "s").await.is_err());
    }

    #[tokio::test]
    async fn concurrent_appends_get_distinct_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(HistoryStore::open(dir.path()).unwrap());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            let user = if i % 2 == 0 { "1" } else { "2" };
            handles.push(tokio::spawn(async move {
                store
                    .append(user, "s", Role::User, &format!("m{i}"))
                    .await
                    .unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        for user in ["1", "2"] {
            let history = store.history(user, "s").await.unwrap();
            let ids: Vec<u64> = history.iter().map(|m| m.id).collect();
            assert_eq!(ids, (1..=10).collect::<Vec<_>>());
            assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

            let lines = std::fs::read_to_string(dir.path().join(format!("{user}.jsonl"))).unwrap();
            assert_eq!(lines.lines().count(), 10);
        }
    }

    #[test]
    fn snippet_truncates_long_text() {
        let msg = ChatMessage {
            id: 1,
            user_id: "1".into(),
            session_id: "s".into(),
            role: Role::User,
            text: "x".repeat(100),
            timestamp: Utc::now(),
        };
        let snippet = msg.snippet();
        assert_eq!(snippet.chars().count(), 83);
        assert!(snippet.ends_with("..."));

        let short = ChatMessage {
            text: "short".into(),
            ..msg
        };
        assert_eq!(short.snippet(), "short");
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Agent).unwrap(), "\"agent\"");
        assert_eq!(Role::User.to_string(), "user");
    }
}
