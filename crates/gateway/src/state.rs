use std::sync::Arc;

use wc_agent::AgentRunner;
use wc_domain::config::Config;
use wc_sessions::{HistoryStore, IdentityResolver, SessionProvisioner, SessionService};

use crate::runtime::session_lock::SessionLockMap;

/// Shared application state passed to all API handlers.
///
/// Everything here is built once at startup and shared across requests.
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────────
    pub config: Arc<Config>,
    /// `None` when the runner could not be built at startup; every chat
    /// turn then fails fast.
    pub runner: Option<Arc<dyn AgentRunner>>,

    // ── Sessions ──────────────────────────────────────────────────────
    pub identity: Arc<IdentityResolver>,
    pub agent_sessions: Arc<dyn SessionService>,
    pub provisioner: Arc<SessionProvisioner>,
    pub session_locks: Arc<SessionLockMap>,

    // ── History ───────────────────────────────────────────────────────
    pub history: Arc<HistoryStore>,
}

impl AppState {
    /// Namespace of the agent sessions: the runner's own app name, or the
    /// configured one while no runner is available.
    pub fn app_name(&self) -> &str {
        match self.runner.as_deref() {
            Some(runner) => runner.app_name(),
            None => &self.config.agent.app_name,
        }
    }
}
