//! `wikichat history`: inspect a user's stored conversations.

use std::collections::HashMap;

use wc_domain::config::Config;
use wc_sessions::{AgentSession, HistoryStore, SessionService};

use super::run::configured_user;
use crate::bootstrap::open_session_service;

pub async fn history(config: &Config, user: u64, session: Option<String>) -> anyhow::Result<()> {
    let user_id = configured_user(config, user)?;
    let store = HistoryStore::open(&config.history.path)?;

    match session {
        None => {
            let sessions = store.sessions(&user_id).await?;
            if sessions.is_empty() {
                println!("No sessions for user {user_id}.");
                return Ok(());
            }

            let agent_sessions: HashMap<String, AgentSession> =
                open_session_service(&config.sessions)?
                    .list_sessions(&config.agent.app_name, &user_id)
                    .await?
                    .into_iter()
                    .map(|s| (s.id.clone(), s))
                    .collect();

            for session_id in sessions {
                let count = store.history(&user_id, &session_id).await?.len();
                println!(
                    "{session_id}  ({count} messages, {})",
                    agent_context(agent_sessions.get(&session_id))
                );
            }
        }
        Some(session_id) => {
            for m in store.history(&user_id, &session_id).await? {
                println!(
                    "[{}] {:>5}: {}",
                    m.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    m.role,
                    m.text
                );
            }
        }
    }
    Ok(())
}

/// One-line description of the agent-side session backing a conversation.
fn agent_context(session: Option<&AgentSession>) -> String {
    match session {
        Some(s) => format!(
            "agent session updated {}",
            s.updated_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => "no agent session".to_owned(),
    }
}
