//! Turn orchestration — the 1–2 round-trip protocol against the
//! completion provider plus the concurrent weather-lookup fan-out.
//!
//! Per turn the state machine is
//! `AWAIT_FIRST_COMPLETION → (DIRECT_ANSWER | EXECUTE_TOOLS) →
//! [AWAIT_SECOND_COMPLETION] → DONE | FAILED`. Every failure is caught
//! here and converted to a localized apology; nothing escapes to the
//! caller unformatted, and nothing is retried.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use sky_domain::chat::{Language, Message, ToolCall};
use sky_domain::error::Error;
use sky_providers::{ChatRequest, CompletionProvider};
use sky_weather::dates::{classify, DateClassification};
use sky_weather::{LookupOutcome, WeatherLookup, WeatherObservation};

use super::prompts;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input / output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Input to one orchestrated turn.
pub struct TurnRequest {
    /// Prior conversation messages, oldest first, without any system
    /// preamble (the orchestrator supplies its own).
    pub history: Vec<Message>,
    /// The current user input, already rewritten by the resolver when
    /// stored context applied.
    pub query: String,
    pub language: Language,
    /// Session digest embedded in the instruction preamble.
    pub context_hint: Option<String>,
}

/// Typed `get_weather` arguments, parsed at the boundary. A payload that
/// does not fit this shape fails the turn as a tool error rather than
/// propagating loose JSON downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct GetWeatherArgs {
    pub location: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// One executed lookup, kept in tool-invocation order.
pub struct ResolvedCall {
    pub call_id: String,
    pub args: GetWeatherArgs,
    pub classification: DateClassification,
    pub outcome: LookupOutcome,
}

/// Why a turn ended in FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnFailure {
    /// A completion round trip failed (transport or non-success status).
    Upstream,
    /// A weather lookup failed, or its arguments were malformed.
    Tool,
}

/// Result of one turn, failure paths included — the `response` of a
/// failed turn is the localized apology.
pub struct TurnOutcome {
    pub response: String,
    pub calls: Vec<ResolvedCall>,
    pub failure: Option<TurnFailure>,
}

impl TurnOutcome {
    pub fn tools_used(&self) -> usize {
        self.calls.len()
    }

    pub fn multi_city(&self) -> bool {
        self.calls.len() > 1
    }

    pub fn observations(&self) -> Vec<&WeatherObservation> {
        self.calls.iter().map(|c| &c.outcome.observation).collect()
    }

    fn failed(failure: TurnFailure, language: Language) -> Self {
        let response = match failure {
            TurnFailure::Upstream => prompts::apology_upstream(language),
            TurnFailure::Tool => prompts::apology_tool(language),
        };
        Self {
            response: response.to_string(),
            calls: Vec::new(),
            failure: Some(failure),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// run_turn — the orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Drive one turn to DONE or FAILED. Never returns an error: failures
/// come back as a [`TurnOutcome`] carrying the apology and the failure
/// kind (the HTTP layer maps upstream failures to a non-success status).
pub async fn run_turn(
    provider: &dyn CompletionProvider,
    weather: &dyn WeatherLookup,
    request: TurnRequest,
) -> TurnOutcome {
    let language = request.language;
    match run_turn_inner(provider, weather, request).await {
        Ok(outcome) => outcome,
        Err(TurnError(failure, source)) => {
            tracing::warn!(?failure, error = %source, "turn failed");
            TurnOutcome::failed(failure, language)
        }
    }
}

struct TurnError(TurnFailure, Error);

async fn run_turn_inner(
    provider: &dyn CompletionProvider,
    weather: &dyn WeatherLookup,
    request: TurnRequest,
) -> Result<TurnOutcome, TurnError> {
    let today = Utc::now().date_naive();

    // ── First round trip ──────────────────────────────────────────
    let first = provider
        .chat(&first_request(&request, today))
        .await
        .map_err(|e| TurnError(TurnFailure::Upstream, e))?;

    if let Some(usage) = first.usage {
        tracing::debug!(
            model = %first.model,
            total_tokens = usage.total_tokens,
            tool_calls = first.tool_calls.len(),
            "first completion done"
        );
    }

    // No tool invocations: the model answered directly.
    if first.tool_calls.is_empty() {
        return Ok(TurnOutcome {
            response: first.content,
            calls: Vec::new(),
            failure: None,
        });
    }

    // ── Execute tools ─────────────────────────────────────────────
    let parsed = parse_tool_calls(&first.tool_calls, today)
        .map_err(|e| TurnError(TurnFailure::Tool, e))?;

    // Fan out every lookup at once; fan in with order preserved. The
    // join is fail-fast in effect: any single failure voids the turn,
    // no partial results survive.
    let lookups = futures_util::future::join_all(parsed.iter().map(|(_, args, _)| {
        weather.lookup(&args.location, args.date.as_deref())
    }))
    .await;

    let mut calls = Vec::with_capacity(parsed.len());
    for ((call_id, args, classification), lookup) in parsed.into_iter().zip(lookups) {
        let outcome = lookup.map_err(|e| TurnError(TurnFailure::Tool, e))?;
        calls.push(ResolvedCall {
            call_id,
            args,
            classification,
            outcome,
        });
    }

    // ── Second round trip: format the observations ────────────────
    let second = provider
        .chat(&second_request(&request, &first.content, &first.tool_calls, &calls))
        .await
        .map_err(|e| TurnError(TurnFailure::Upstream, e))?;

    tracing::info!(
        tools_used = calls.len(),
        multi_city = calls.len() > 1,
        "turn complete"
    );

    Ok(TurnOutcome {
        response: second.content,
        calls,
        failure: None,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request assembly
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn first_request(request: &TurnRequest, today: NaiveDate) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(Message::system(prompts::first_preamble(
        request.language,
        today,
        request.context_hint.as_deref(),
    )));
    messages.extend(request.history.iter().cloned());
    messages.push(Message::user(&request.query));

    ChatRequest {
        messages,
        tools: vec![prompts::weather_tool()],
        temperature: Some(0.7),
        max_tokens: None,
    }
}

/// The second request replays the history, the assistant's tool-use
/// message, and one tool-result message per invocation — same order as
/// requested, each tagged with its originating call id.
fn second_request(
    request: &TurnRequest,
    assistant_text: &str,
    tool_calls: &[ToolCall],
    calls: &[ResolvedCall],
) -> ChatRequest {
    let mut messages = Vec::with_capacity(request.history.len() + calls.len() + 3);
    messages.push(Message::system(prompts::formatting_preamble(
        request.language,
        calls.len() > 1,
    )));
    messages.extend(request.history.iter().cloned());
    messages.push(Message::user(&request.query));
    messages.push(Message::assistant_tool_calls(assistant_text, tool_calls));
    for call in calls {
        let payload = serde_json::to_string(&call.outcome.observation)
            .unwrap_or_else(|_| "{}".to_string());
        messages.push(Message::tool_result(&call.call_id, payload));
    }

    ChatRequest {
        messages,
        tools: Vec::new(),
        temperature: Some(0.7),
        max_tokens: None,
    }
}

/// Derive the session context merge from a completed tool-path turn:
/// location and timeframe from the first resolved call, intent and query
/// bookkeeping from the raw (pre-rewrite) query. Direct-answer turns
/// merge nothing.
pub fn context_update_from(
    raw_query: &str,
    language: Language,
    outcome: &TurnOutcome,
) -> Option<sky_domain::context::ContextUpdate> {
    use sky_domain::context::{ContextUpdate, ConversationUpdate, LocationData, TemporalUpdate};

    let first = outcome.calls.first()?;
    let coords = &first.outcome.coordinates;
    Some(ContextUpdate {
        location: Some(LocationData {
            city: coords.city.clone(),
            country: coords.country.clone(),
            latitude: coords.latitude,
            longitude: coords.longitude,
            timezone: coords.timezone.clone(),
            confidence: None,
            last_used_at: None,
        }),
        temporal: Some(TemporalUpdate {
            timeframe: first.classification.date_type,
            target_date: first.classification.target_date,
            relative_date_hint: first.args.date.clone(),
        }),
        conversation: Some(ConversationUpdate {
            last_query: Some(raw_query.to_string()),
            intent: Some(super::resolver::derive_intent(
                raw_query,
                language,
                outcome.calls.len(),
            )),
            follow_up_hint: None,
            last_response: Some(outcome.response.clone()),
        }),
        preferences: None,
    })
}

/// Parse every requested invocation into typed arguments, rejecting
/// unknown tool names and malformed payloads up front.
fn parse_tool_calls(
    tool_calls: &[ToolCall],
    today: NaiveDate,
) -> Result<Vec<(String, GetWeatherArgs, DateClassification)>, Error> {
    tool_calls
        .iter()
        .map(|tc| {
            if tc.tool_name != "get_weather" {
                return Err(Error::Tool {
                    tool: tc.tool_name.clone(),
                    message: "unknown tool".into(),
                });
            }
            let args: GetWeatherArgs =
                serde_json::from_value(tc.arguments.clone()).map_err(|e| Error::Tool {
                    tool: tc.tool_name.clone(),
                    message: format!("malformed arguments: {e}"),
                })?;
            let classification = classify(args.date.as_deref(), today);
            Ok((tc.call_id.clone(), args, classification))
        })
        .collect()
}
