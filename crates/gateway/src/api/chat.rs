//! `POST /chat?session_id=<id>`: one question, one answer.
//!
//! Body: `{"message": "<text>"}`.  Checks run in a fixed order so the
//! caller always sees the first problem: body shape, then the message
//! field, then the session id.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wc_sessions::{AuthenticatedUser, Caller, IdentityResolver};

use crate::error::ApiError;
use crate::runtime::{run_chat_turn, TurnError};
use crate::state::AppState;

/// Longest accepted session id.
pub const MAX_SESSION_ID_CHARS: usize = 255;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<ChatQuery>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    if state.runner.is_none() {
        return Err(TurnError::RunnerUnavailable.into());
    }

    let Json(body) = body.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    let message = validate_message(&body, state.config.history.max_message_chars)?;
    let session_id = validate_session_id(query.session_id)?;

    let user_id = IdentityResolver::external_user_id(&Caller::Authenticated(user));
    let turn = run_chat_turn(&state, &user_id, &session_id, &message).await?;

    Ok(Json(ChatResponse {
        response: turn.response().to_owned(),
    }))
}

/// Extract and normalise the `message` field.  Surrounding whitespace is
/// trimmed before the blank and length checks.
pub fn validate_message(body: &Value, max_chars: usize) -> Result<String, ApiError> {
    let Some(object) = body.as_object() else {
        return Err(ApiError::MalformedBody(
            "Invalid data. Expected a JSON object.".into(),
        ));
    };
    let raw = match object.get("message") {
        None | Some(Value::Null) => {
            return Err(ApiError::validation("message", "This field is required."))
        }
        Some(Value::String(s)) => s,
        Some(_) => return Err(ApiError::validation("message", "Not a valid string.")),
    };

    let message = raw.trim();
    if message.is_empty() {
        return Err(ApiError::validation("message", "This field may not be blank."));
    }
    if message.chars().count() > max_chars {
        return Err(ApiError::validation(
            "message",
            format!("Ensure this field has no more than {max_chars} characters."),
        ));
    }
    Ok(message.to_owned())
}

fn validate_session_id(session_id: Option<String>) -> Result<String, ApiError> {
    let session_id = session_id
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingSessionId)?;
    if session_id.chars().count() > MAX_SESSION_ID_CHARS {
        return Err(ApiError::validation(
            "session_id",
            format!("Ensure this field has no more than {MAX_SESSION_ID_CHARS} characters."),
        ));
    }
    Ok(session_id)
}
