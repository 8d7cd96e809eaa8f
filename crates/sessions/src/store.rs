//! Agent session store.
//!
//! The conversational agent keeps its own per-(app, user, session) state:
//! the sequence of events (user turns and model turns) it replays as
//! context on every run.  [`SessionService`] is the seam the provisioner
//! and the agent runner talk to; [`LocalSessionService`] is the bundled
//! implementation, either purely in memory or snapshotted to
//! `agent_sessions.json` under the configured state path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use wc_domain::content::Content;
use wc_domain::error::{Error, Result};

/// File name of the persisted snapshot inside the state directory.
pub const SESSIONS_FILE: &str = "agent_sessions.json";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session records
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One event in an agent session's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEvent {
    pub id: String,
    /// `"user"` or the agent's name.
    pub author: String,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(author: impl Into<String>, content: Content) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            content,
            timestamp: Utc::now(),
        }
    }
}

/// Agent-side state for one `(app_name, user_id, session_id)` triple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSession {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_owned(),
            user_id: user_id.to_owned(),
            session_id: session_id.to_owned(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Service trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait SessionService: Send + Sync {
    /// Fetch a session, or `None` if it does not exist.
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<AgentSession>>;

    /// Create an empty session.  Fails with [`Error::AlreadyExists`] if the
    /// triple is already present.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<AgentSession>;

    /// Append one event.  Fails with [`Error::NotFound`] if the session
    /// has not been created.
    async fn append_event(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        event: SessionEvent,
    ) -> Result<()>;

    /// All sessions of one user, most recently updated first.  Events are
    /// left out.
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<AgentSession>>;

    /// Short backend name for readiness output (`"memory"`, `"file"`).
    fn backend(&self) -> &'static str;

    /// Persist any buffered state.  No-op for stores without durability.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Local implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    sessions: Vec<AgentSession>,
}

/// In-process session store with optional JSON snapshot persistence.
pub struct LocalSessionService {
    path: Option<PathBuf>,
    sessions: RwLock<HashMap<SessionKey, AgentSession>>,
    /// Serializes snapshot writes so an older snapshot never lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

impl LocalSessionService {
    /// A store that forgets everything on restart.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            sessions: RwLock::new(HashMap::new()),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load or create the store at `state_path/agent_sessions.json`.
    pub fn open(state_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_path)?;
        let path = state_path.join(SESSIONS_FILE);

        let mut sessions = HashMap::new();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|e| {
                Error::Other(format!("parsing {}: {e}", path.display()))
            })?;
            for session in snapshot.sessions {
                let key = SessionKey::new(&session.app_name, &session.user_id, &session.id);
                sessions.insert(key, session);
            }
        }

        tracing::info!(
            sessions = sessions.len(),
            path = %path.display(),
            "agent session store loaded"
        );

        Ok(Self {
            path: Some(path),
            sessions: RwLock::new(sessions),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Number of sessions across all apps and users.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let _guard = self.persist_lock.lock().await;
        let json = {
            let sessions = self.sessions.read();
            let mut snapshot = Snapshot {
                sessions: sessions.values().cloned().collect(),
            };
            snapshot
                .sessions
                .sort_by(|a, b| (&a.user_id, &a.id).cmp(&(&b.user_id, &b.id)));
            serde_json::to_string_pretty(&snapshot)?
        };

        tokio::task::spawn_blocking(move || {
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, json)?;
            std::fs::rename(&tmp, &path)?;
            Ok::<(), Error>(())
        })
        .await
        .map_err(|e| Error::Other(format!("spawn_blocking join: {e}")))??;

        Ok(())
    }
}

impl Default for LocalSessionService {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl SessionService for LocalSessionService {
    async fn get_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<AgentSession>> {
        let key = SessionKey::new(app_name, user_id, session_id);
        Ok(self.sessions.read().get(&key).cloned())
    }

    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<AgentSession> {
        let key = SessionKey::new(app_name, user_id, session_id);
        let session = {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(&key) {
                return Err(Error::AlreadyExists(format!(
                    "session {session_id} for user {user_id}"
                )));
            }
            let now = Utc::now();
            let session = AgentSession {
                app_name: app_name.to_owned(),
                user_id: user_id.to_owned(),
                id: session_id.to_owned(),
                created_at: now,
                updated_at: now,
                events: Vec::new(),
            };
            sessions.insert(key, session.clone());
            session
        };

        self.persist().await?;
        Ok(session)
    }

    async fn append_event(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: &str,
        event: SessionEvent,
    ) -> Result<()> {
        let key = SessionKey::new(app_name, user_id, session_id);
        {
            let mut sessions = self.sessions.write();
            let session = sessions.get_mut(&key).ok_or_else(|| {
                Error::NotFound(format!("session {session_id} for user {user_id}"))
            })?;
            session.updated_at = event.timestamp.max(session.updated_at);
            session.events.push(event);
        }
        self.persist().await
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<AgentSession>> {
        let mut out: Vec<AgentSession> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .map(|s| AgentSession {
                events: Vec::new(),
                ..s.clone()
            })
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }

    fn backend(&self) -> &'static str {
        if self.path.is_some() {
            "file"
        } else {
            "memory"
        }
    }

    async fn flush(&self) -> Result<()> {
        self.persist().await
    }
}
