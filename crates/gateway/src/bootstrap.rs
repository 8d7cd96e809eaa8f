//! AppState construction and background-task spawning.
//!
//! `serve`, `run` and `history` all boot through [`build_app_state`] so the
//! CLI exercises exactly the stores and runner the HTTP server uses.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use wc_agent::AgentRunner;
use wc_domain::config::{Config, ConfigSeverity, SessionBackend, SessionsConfig};
use wc_sessions::{
    HistoryStore, IdentityResolver, LocalSessionService, SessionCache, SessionProvisioner,
    SessionService,
};

use crate::runtime::session_lock::SessionLockMap;
use crate::state::AppState;

/// Validate config, open every store and build the agent runner.
///
/// A runner that cannot be built (typically a missing API key) does not
/// abort startup: the state is returned with `runner: None` and chat
/// turns fail fast until the process is reconfigured.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    validate_config(&config)?;
    let agent_sessions = open_session_service(&config.sessions)?;
    assemble(config, agent_sessions, |cfg, sessions| {
        match wc_agent::build_runner(&cfg.agent, sessions) {
            Ok(runner) => {
                tracing::info!(
                    agent = %runner.agent_name(),
                    model = %cfg.agent.model,
                    "agent runner ready"
                );
                Some(runner)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "agent runner unavailable, chat requests will fail until configured"
                );
                None
            }
        }
    })
}

/// Like [`build_app_state`], with the agent session store and the runner
/// supplied by the caller.  `make_runner` receives the session store the
/// runner must share with the provisioner.
pub fn build_app_state_with<F>(
    config: Arc<Config>,
    agent_sessions: Arc<dyn SessionService>,
    make_runner: F,
) -> anyhow::Result<AppState>
where
    F: FnOnce(&Config, Arc<dyn SessionService>) -> Option<Arc<dyn AgentRunner>>,
{
    validate_config(&config)?;
    assemble(config, agent_sessions, make_runner)
}

/// Open the agent session store for the configured backend.
pub fn open_session_service(cfg: &SessionsConfig) -> anyhow::Result<Arc<dyn SessionService>> {
    let service: Arc<dyn SessionService> = match cfg.backend {
        SessionBackend::Memory => Arc::new(LocalSessionService::in_memory()),
        SessionBackend::File => Arc::new(
            LocalSessionService::open(&cfg.state_path).context("opening agent session store")?,
        ),
    };
    tracing::info!(backend = service.backend(), "agent session store ready");
    Ok(service)
}

fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }
    Ok(())
}

fn assemble<F>(
    config: Arc<Config>,
    agent_sessions: Arc<dyn SessionService>,
    make_runner: F,
) -> anyhow::Result<AppState>
where
    F: FnOnce(&Config, Arc<dyn SessionService>) -> Option<Arc<dyn AgentRunner>>,
{
    // ── Identity ─────────────────────────────────────────────────────
    let identity =
        Arc::new(IdentityResolver::from_config(&config.auth).context("loading user tokens")?);
    tracing::info!(users = identity.len(), "identity resolver ready");

    // ── Agent session provisioning ───────────────────────────────────
    let provisioner = Arc::new(SessionProvisioner::new(
        agent_sessions.clone(),
        Arc::new(SessionCache::new()),
    ));

    // ── Chat history ─────────────────────────────────────────────────
    let history =
        Arc::new(HistoryStore::open(&config.history.path).context("opening history store")?);

    // ── Agent runner ─────────────────────────────────────────────────
    let runner = make_runner(&config, agent_sessions.clone());

    Ok(AppState {
        config,
        runner,
        identity,
        agent_sessions,
        provisioner,
        session_locks: Arc::new(SessionLockMap::new()),
        history,
    })
}

/// Spawn the long-running background tasks: idle lock pruning and
/// periodic session store flushes.
///
/// Only the HTTP server needs these; one-shot CLI commands skip them.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Periodic session flush ───────────────────────────────────────
    {
        let sessions = state.agent_sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                if let Err(e) = sessions.flush().await {
                    tracing::warn!(error = %e, "session store flush failed");
                }
            }
        });
    }

    // ── Periodic session lock pruning ────────────────────────────────
    {
        let session_locks = state.session_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let before = session_locks.session_count();
                session_locks.prune_idle();
                let pruned = before.saturating_sub(session_locks.session_count());
                if pruned > 0 {
                    tracing::debug!(pruned, "pruned idle session locks");
                }
            }
        });
    }

    tracing::info!("background tasks spawned");
}
