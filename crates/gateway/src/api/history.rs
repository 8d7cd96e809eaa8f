//! `GET /history?session_id=<id>`: the caller's messages in one session
//! plus every session id the caller has used.

use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wc_sessions::{AuthenticatedUser, Caller, ChatMessage, IdentityResolver, Role};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for HistoryEntry {
    fn from(m: ChatMessage) -> Self {
        Self {
            role: m.role,
            text: m.text,
            timestamp: m.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_session_id: Option<String>,
    pub sessions: Vec<String>,
}

pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Some(session_id) = query.session_id.filter(|s| !s.is_empty()) else {
        return Ok(Json(HistoryResponse {
            history: Vec::new(),
            current_session_id: None,
            sessions: Vec::new(),
        }));
    };

    let user_id = IdentityResolver::external_user_id(&Caller::Authenticated(user));
    let history = state.history.history(&user_id, &session_id).await?;
    let sessions = state.history.sessions(&user_id).await?;

    Ok(Json(HistoryResponse {
        history: history.into_iter().map(HistoryEntry::from).collect(),
        current_session_id: Some(session_id),
        sessions,
    }))
}
