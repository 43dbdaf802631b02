//! Chat endpoint — the inbound surface of the turn orchestrator.
//!
//! `POST /v1/chat` accepts the message history plus language and an
//! optional session id. Upstream completion failures map to a 502 with
//! the in-band `error` flag; tool-execution failures keep a success
//! status with `error: true` (the apology is the response body either
//! way). An unknown or expired session id silently degrades to a
//! stateless turn.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use sky_domain::chat::{Language, Message};

use crate::runtime::prompts;
use crate::runtime::turn::context_update_from;
use crate::runtime::{resolve_query, run_turn, TurnFailure, TurnOutcome, TurnRequest};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurnRequest {
    /// Conversation so far, oldest first, ending with the current user
    /// message.
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub language: Language,
    /// Server-side session to consult and update. Absent = stateless.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub role: String,
    pub content: String,
    #[serde(default, alias = "tool_call_id")]
    pub tool_call_id: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatTurnRequest>,
) -> impl IntoResponse {
    let query = match body.messages.last() {
        Some(m) if m.role == "user" => m.content.clone(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "messages must end with a user message" })),
            )
                .into_response();
        }
    };
    let history = to_history(&body.messages[..body.messages.len() - 1]);

    // One turn at a time per session id.
    let _permit = match body.session_id.as_deref() {
        Some(id) => match state.session_locks.acquire(id).await {
            Ok(permit) => Some(permit),
            Err(e) => {
                tracing::error!(error = %e, "session lock unavailable");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response();
            }
        },
        None => None,
    };

    // Unknown or expired session: fall back to stateless resolution.
    let session = body.session_id.as_deref().and_then(|id| {
        let found = state.sessions.get(id);
        if found.is_none() {
            tracing::debug!(session_id = id, "session unknown or expired — stateless turn");
        }
        found
    });

    let (effective_query, context_hint) = match &session {
        Some(s) => {
            let resolution = resolve_query(
                &query,
                body.language,
                s.context.location.current.as_ref(),
            );
            if resolution.needs_location_input {
                // No stored city and none in the query: ask, don't guess.
                return Json(json!({
                    "response": prompts::clarify_location(body.language),
                    "toolsUsed": 0,
                    "multiCity": false,
                }))
                .into_response();
            }
            (resolution.contextual_query, Some(s.context.summarize()))
        }
        None => (query.clone(), None),
    };

    let outcome = run_turn(
        state.provider.as_ref(),
        state.weather.as_ref(),
        TurnRequest {
            history,
            query: effective_query,
            language: body.language,
            context_hint,
        },
    )
    .await;

    match outcome.failure {
        Some(TurnFailure::Upstream) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "response": outcome.response, "error": true })),
        )
            .into_response(),
        Some(TurnFailure::Tool) => {
            Json(json!({ "response": outcome.response, "error": true })).into_response()
        }
        None => {
            // Context merges only when a tool ran; a direct answer leaves
            // the session untouched.
            if let Some(id) = body.session_id.as_deref() {
                if session.is_some() {
                    if let Some(update) = context_update_from(&query, body.language, &outcome) {
                        state.sessions.update(id, update);
                    }
                }
            }
            Json(turn_response(&outcome)).into_response()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn to_history(messages: &[WireMessage]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|m| match m.role.as_str() {
            "user" => Some(Message::user(&m.content)),
            "assistant" => Some(Message::assistant(&m.content)),
            "tool" => Some(Message::tool_result(
                m.tool_call_id.clone().unwrap_or_default(),
                &m.content,
            )),
            other => {
                tracing::debug!(role = other, "dropping message with unknown role");
                None
            }
        })
        .collect()
}

fn turn_response(outcome: &TurnOutcome) -> Value {
    let mut body = json!({
        "response": outcome.response,
        "toolsUsed": outcome.tools_used(),
        "multiCity": outcome.multi_city(),
    });
    let observations = outcome.observations();
    match observations.len() {
        0 => {}
        1 => {
            body["weatherData"] =
                serde_json::to_value(observations[0]).unwrap_or(Value::Null);
        }
        _ => {
            body["weatherData"] = serde_json::to_value(&observations).unwrap_or(Value::Null);
        }
    }
    body
}
