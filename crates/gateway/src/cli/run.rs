//! `wikichat run`: one chat turn from the command line.
//!
//! Goes through the same orchestration path as `POST /chat` (lock,
//! provisioning, history, agent run), so the exchange shows up in the
//! user's web history afterwards.

use std::sync::Arc;

use wc_domain::config::Config;

use crate::api::index::new_session_id;
use crate::bootstrap;
use crate::runtime::run_chat_turn;

pub async fn run(
    config: Arc<Config>,
    message: String,
    user: u64,
    session: Option<String>,
) -> anyhow::Result<()> {
    let user_id = configured_user(&config, user)?;
    let message = message.trim();
    if message.is_empty() {
        anyhow::bail!("message must not be blank");
    }

    let state = bootstrap::build_app_state(config)?;
    let session_id = session.filter(|s| !s.is_empty()).unwrap_or_else(new_session_id);
    eprintln!("\x1b[2m[session: {session_id}]\x1b[0m");

    let result = run_chat_turn(&state, &user_id, &session_id, message).await;

    if let Err(e) = state.agent_sessions.flush().await {
        tracing::warn!(error = %e, "session store flush on exit failed");
    }

    let turn = result?;
    for tool in &turn.tool_calls {
        eprintln!("\x1b[2m[tool: {tool}]\x1b[0m");
    }
    println!("{}", turn.response());
    Ok(())
}

/// The external user id for a configured numeric user.
pub(crate) fn configured_user(config: &Config, user: u64) -> anyhow::Result<String> {
    if !config.auth.users.iter().any(|u| u.id == user) {
        anyhow::bail!("no user with id {user} in [[auth.users]]");
    }
    Ok(user.to_string())
}
