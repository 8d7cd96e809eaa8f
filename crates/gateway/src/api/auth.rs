//! Bearer-token authentication middleware.
//!
//! The token in `Authorization: Bearer <token>` is resolved against the
//! configured users once per request.  Protected handlers read the caller
//! from the request extensions as [`AuthenticatedUser`].

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use wc_sessions::Caller;

use crate::error::ApiError;
use crate::state::AppState;

/// Reject anonymous callers with 401; otherwise attach the
/// [`AuthenticatedUser`](wc_sessions::AuthenticatedUser) to the request.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match state.identity.authenticate(token) {
        Caller::Authenticated(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Caller::Anonymous => ApiError::Unauthorized.into_response(),
    }
}
