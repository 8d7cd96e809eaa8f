//! Chat turn orchestration.
//!
//! Entry point: [`run_chat_turn`].  Stage order is fixed: the conversation
//! lock is taken, the agent session is provisioned, the user's message is
//! recorded, the agent runs, and only a successful answer is recorded.  A
//! failed provisioning therefore leaves no trace; a failed run leaves the
//! user's message and nothing else.

pub mod session_lock;
pub mod turn;

use std::time::Duration;

use wc_domain::error::Error;
use wc_sessions::{ChatMessage, Role};

use crate::state::AppState;

pub use turn::{RunOutcome, TurnExecutor};

/// Why a chat turn failed.  The display strings are user-visible.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("Error: Agent runner is not initialized.")]
    RunnerUnavailable,

    #[error("Session Init Error: {0}")]
    Provisioning(#[source] Error),

    #[error("Error: could not save chat message: {0}")]
    History(#[source] Error),

    #[error("An agent error occurred during run: {0}")]
    AgentRun(String),

    #[error("An agent error occurred during run: the agent produced no final response.")]
    NoFinalResponse,

    #[error("The agent did not answer within {} seconds.", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Error: {0}")]
    Lock(#[from] session_lock::LockClosed),
}

/// Both halves of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub user_message: ChatMessage,
    pub agent_message: ChatMessage,
    pub tool_calls: Vec<String>,
}

impl TurnResult {
    pub fn response(&self) -> &str {
        &self.agent_message.text
    }
}

/// Run one chat turn for an external user id and session id.  `message`
/// must already be validated.
pub async fn run_chat_turn(
    state: &AppState,
    user_id: &str,
    session_id: &str,
    message: &str,
) -> Result<TurnResult, TurnError> {
    let runner = state.runner.clone().ok_or(TurnError::RunnerUnavailable)?;

    let _permit = state.session_locks.acquire(user_id, session_id).await?;

    state
        .provisioner
        .ensure(runner.app_name(), user_id, session_id)
        .await
        .map_err(TurnError::Provisioning)?;

    let user_message = state
        .history
        .append(user_id, session_id, Role::User, message)
        .await
        .map_err(TurnError::History)?;

    let timeout = Duration::from_secs(state.config.agent.run_timeout_secs);
    let outcome = TurnExecutor::new(runner, timeout)
        .run(user_id, session_id, message)
        .await?;

    let agent_message = state
        .history
        .append(user_id, session_id, Role::Agent, &outcome.text)
        .await
        .map_err(TurnError::History)?;

    tracing::info!(
        user_id,
        session_id,
        question = %user_message.snippet(),
        answer = %agent_message.snippet(),
        tool_calls = outcome.tool_calls.len(),
        "chat turn completed"
    );

    Ok(TurnResult {
        user_message,
        agent_message,
        tool_calls: outcome.tool_calls,
    })
}
