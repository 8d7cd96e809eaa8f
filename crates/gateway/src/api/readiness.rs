use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub runner_ready: bool,
    pub app_name: String,
    pub agent: String,
    pub session_backend: &'static str,
}

/// `GET /readiness`: whether chat turns can run right now.
pub async fn readiness(State(state): State<AppState>) -> Json<Readiness> {
    Json(Readiness {
        runner_ready: state.runner.is_some(),
        app_name: state.app_name().to_owned(),
        agent: state.config.agent.name.clone(),
        session_backend: state.agent_sessions.backend(),
    })
}
