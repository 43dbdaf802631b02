pub mod chat;
pub mod sessions;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health probe
        .route("/v1/health", get(health))
        // Chat (core orchestration)
        .route("/v1/chat", post(chat::chat))
        // Session management
        .route(
            "/v1/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/v1/sessions/:id", get(sessions::get_session))
        .route("/v1/sessions/:id/reset", post(sessions::reset_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /v1/health — liveness plus which provider adapter is wired in.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "provider": state.provider.provider_id(),
        "sessions": state.sessions.len(),
    }))
}
