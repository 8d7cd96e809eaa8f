//! HTTP error mapping.
//!
//! Every failure a handler can hit becomes an [`ApiError`], which renders
//! the status code and JSON payload the chat page expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::runtime::TurnError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No valid bearer token.
    #[error("Authentication required.")]
    Unauthorized,

    /// The request body was not JSON (or not an object).
    #[error("{0}")]
    MalformedBody(String),

    /// One request field failed validation.
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Error: Session ID is missing.")]
    MissingSessionId,

    #[error(transparent)]
    Turn(#[from] TurnError),

    /// Reading stored data failed.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::MalformedBody(_)
            | ApiError::Validation { .. }
            | ApiError::MissingSessionId => StatusCode::BAD_REQUEST,
            ApiError::Turn(TurnError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Turn(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Unauthorized | ApiError::Internal(_) => json!({ "error": self.to_string() }),
            ApiError::MalformedBody(detail) => json!({ "detail": detail }),
            ApiError::Validation { field, message } => {
                let mut errors = serde_json::Map::new();
                errors.insert((*field).to_owned(), json!([message]));
                serde_json::Value::Object(errors)
            }
            ApiError::MissingSessionId | ApiError::Turn(_) => {
                json!({ "response": self.to_string() })
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

impl From<wc_domain::error::Error> for ApiError {
    fn from(e: wc_domain::error::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn taxonomy_status_codes() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingSessionId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::validation("message", "too long").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TurnError::RunnerUnavailable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TurnError::NoFinalResponse).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(TurnError::Timeout(Duration::from_secs(120))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn turn_messages_name_the_stage() {
        assert_eq!(
            ApiError::from(TurnError::RunnerUnavailable).to_string(),
            "Error: Agent runner is not initialized."
        );
        assert_eq!(
            ApiError::from(TurnError::AgentRun("boom".into())).to_string(),
            "An agent error occurred during run: boom"
        );
        assert_eq!(
            TurnError::Timeout(Duration::from_secs(120)).to_string(),
            "The agent did not answer within 120 seconds."
        );
    }
}
