pub mod auth;
pub mod chat;
pub mod history;
pub mod index;
pub mod readiness;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (the page shell and readiness check)
/// and **protected** (gated behind bearer-token authentication).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(index::index))
        .route("/readiness", get(readiness::readiness));

    let protected = Router::new()
        .route("/history", get(history::history))
        .route("/chat", post(chat::chat))
        .route_layer(middleware::from_fn_with_state(state, auth::require_user));

    public.merge(protected)
}
