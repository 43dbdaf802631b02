//! Session management endpoints.
//!
//! Operations against an unknown or expired id answer 404 with an error
//! body — they never throw, matching the registry's NotFound contract.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use sky_domain::context::ContextUpdate;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Optional initial context merge (e.g. a known default location).
    #[serde(default)]
    pub seed: Option<ContextUpdate>,
}

/// POST /v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> impl IntoResponse {
    let seed = body.and_then(|Json(b)| b.seed);
    let session = state.sessions.create(seed);
    Json(json!({
        "sessionId": session.session_id,
        "expiresAt": session.expires_at,
    }))
}

/// GET /v1/sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "sessions": state.sessions.list() }))
}

/// GET /v1/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.get(&id) {
        Some(session) => Json(session).into_response(),
        None => not_found(),
    }
}

/// POST /v1/sessions/:id/reset
pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.reset(&id) {
        Some(session) => Json(json!({
            "sessionId": session.session_id,
            "expiresAt": session.expires_at,
        }))
        .into_response(),
        None => not_found(),
    }
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "session not found" })),
    )
        .into_response()
}
