//! End-to-end turn orchestration against scripted provider and lookup
//! fakes: direct answers, single- and multi-city tool rounds, ordering of
//! resubmitted tool results, and the fail-fast paths.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{Duration, Utc};

use sky_domain::chat::{ContentPart, Language, MessageContent, Role, ToolCall};
use sky_domain::context::Timeframe;
use sky_domain::error::{Error, Result};
use sky_gateway::runtime::prompts;
use sky_gateway::runtime::turn::context_update_from;
use sky_gateway::runtime::{run_turn, TurnFailure, TurnRequest};
use sky_providers::{ChatRequest, ChatResponse, CompletionProvider};
use sky_weather::{classify, Coordinates, LookupOutcome, WeatherLookup, WeatherObservation};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fakes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ChatResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, idx: usize) -> ChatRequest {
        self.requests.lock().unwrap()[idx].clone()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(req.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted provider ran out of responses")
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

/// Lookup fake: knows Tokyo and Osaka, fails everything else.
struct TableLookup;

#[async_trait::async_trait]
impl WeatherLookup for TableLookup {
    async fn lookup(&self, location: &str, date: Option<&str>) -> Result<LookupOutcome> {
        let (lat, lon) = match location {
            "Tokyo" => (35.6762, 139.6503),
            "Osaka" => (34.6937, 135.5023),
            other => return Err(Error::LocationNotFound(other.to_string())),
        };
        let classification = classify(date, Utc::now().date_naive());
        Ok(LookupOutcome {
            observation: WeatherObservation {
                city: location.to_string(),
                country: "Japan".into(),
                temperature: 28,
                description: "partly cloudy".into(),
                humidity: 60,
                wind_speed: 4.2,
                precipitation: 0.0,
                uv_index: 6.0,
                timestamp: Utc::now(),
                date_type: classification.date_type,
                target_date: classification.target_date,
            },
            coordinates: Coordinates {
                city: location.to_string(),
                country: "Japan".into(),
                latitude: lat,
                longitude: lon,
                timezone: Some("Asia/Tokyo".into()),
            },
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn text_response(text: &str) -> ChatResponse {
    ChatResponse {
        content: text.to_string(),
        tool_calls: Vec::new(),
        usage: None,
        model: "fake".into(),
        finish_reason: Some("stop".into()),
    }
}

fn tool_response(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse {
        content: String::new(),
        tool_calls: calls,
        usage: None,
        model: "fake".into(),
        finish_reason: Some("tool_calls".into()),
    }
}

fn weather_call(id: &str, location: &str, date: Option<&str>) -> ToolCall {
    let mut args = serde_json::json!({ "location": location });
    if let Some(d) = date {
        args["date"] = serde_json::json!(d);
    }
    ToolCall {
        call_id: id.into(),
        tool_name: "get_weather".into(),
        arguments: args,
    }
}

fn turn(query: &str) -> TurnRequest {
    TurnRequest {
        history: Vec::new(),
        query: query.to_string(),
        language: Language::En,
        context_hint: None,
    }
}

/// Collect the tool_use_ids of the tool-result messages in a request,
/// in message order.
fn tool_result_ids(req: &ChatRequest) -> Vec<String> {
    req.messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .filter_map(|m| match &m.content {
            MessageContent::Parts(parts) => parts.iter().find_map(|p| match p {
                ContentPart::ToolResult { tool_use_id, .. } => Some(tool_use_id.clone()),
                _ => None,
            }),
            _ => None,
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn direct_answer_returns_content_verbatim() {
    let provider = ScriptedProvider::new(vec![Ok(text_response("Hello! Ask me about weather."))]);
    let outcome = run_turn(&provider, &TableLookup, turn("hi there, who are you?")).await;

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.response, "Hello! Ask me about weather.");
    assert_eq!(outcome.tools_used(), 0);
    assert!(!outcome.multi_city());
    assert_eq!(provider.request_count(), 1);

    // The first request declared the weather tool and anchored today's date.
    let first = provider.request(0);
    assert_eq!(first.tools.len(), 1);
    assert_eq!(first.tools[0].name, "get_weather");
    let preamble = first.messages[0].content.text().unwrap().to_string();
    assert!(preamble.contains(&Utc::now().date_naive().to_string()));
}

#[tokio::test]
async fn single_city_turn_runs_two_round_trips() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![weather_call("call_1", "Tokyo", None)])),
        Ok(text_response("It's 28°C and partly cloudy in Tokyo.")),
    ]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tokyo weather")).await;

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.tools_used(), 1);
    assert!(!outcome.multi_city());
    assert_eq!(outcome.response, "It's 28°C and partly cloudy in Tokyo.");

    let observations = outcome.observations();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].city, "Tokyo");
    assert_eq!(observations[0].date_type, Timeframe::Current);
    assert!(observations[0].target_date.is_none());

    // Second round trip carried the tool result tagged with its call id.
    assert_eq!(provider.request_count(), 2);
    assert_eq!(tool_result_ids(&provider.request(1)), vec!["call_1"]);
}

#[tokio::test]
async fn multi_city_results_preserve_invocation_order() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![
            weather_call("call_1", "Tokyo", None),
            weather_call("call_2", "Osaka", None),
        ])),
        Ok(text_response("Tokyo and Osaka are both pleasant today.")),
    ]);
    let outcome = run_turn(&provider, &TableLookup, turn("Compare Tokyo and Osaka")).await;

    assert!(outcome.failure.is_none());
    assert_eq!(outcome.tools_used(), 2);
    assert!(outcome.multi_city());

    let observations = outcome.observations();
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].city, "Tokyo");
    assert_eq!(observations[1].city, "Osaka");

    // Tool results resubmitted in invocation order.
    assert_eq!(
        tool_result_ids(&provider.request(1)),
        vec!["call_1", "call_2"]
    );
}

#[tokio::test]
async fn forecast_date_flows_through_to_observation() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![weather_call(
            "call_1",
            "Tokyo",
            Some("tomorrow"),
        )])),
        Ok(text_response("Tomorrow in Tokyo looks mild.")),
    ]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tomorrow?")).await;

    assert!(outcome.failure.is_none());
    let observations = outcome.observations();
    assert_eq!(observations[0].date_type, Timeframe::Forecast);
    assert_eq!(
        observations[0].target_date,
        Some(Utc::now().date_naive() + Duration::days(1))
    );
}

#[tokio::test]
async fn one_failing_lookup_voids_the_whole_turn() {
    let provider = ScriptedProvider::new(vec![Ok(tool_response(vec![
        weather_call("call_1", "Tokyo", None),
        weather_call("call_2", "Atlantis", None),
    ]))]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tokyo and Atlantis?")).await;

    assert_eq!(outcome.failure, Some(TurnFailure::Tool));
    assert_eq!(outcome.response, prompts::apology_tool(Language::En));
    // No partial results from the lookup that succeeded.
    assert!(outcome.observations().is_empty());
    assert_eq!(outcome.tools_used(), 0);
    // The second round trip never happened.
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn upstream_failure_yields_localized_apology() {
    let provider = ScriptedProvider::new(vec![Err(Error::Http("connection refused".into()))]);
    let mut request = turn("東京の天気は？");
    request.language = Language::Ja;
    let outcome = run_turn(&provider, &TableLookup, request).await;

    assert_eq!(outcome.failure, Some(TurnFailure::Upstream));
    assert_eq!(outcome.response, prompts::apology_upstream(Language::Ja));
}

#[tokio::test]
async fn second_round_trip_failure_is_also_terminal() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![weather_call("call_1", "Tokyo", None)])),
        Err(Error::Http("timeout".into())),
    ]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tokyo weather")).await;

    assert_eq!(outcome.failure, Some(TurnFailure::Upstream));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn malformed_tool_arguments_fail_as_tool_error() {
    let provider = ScriptedProvider::new(vec![Ok(tool_response(vec![ToolCall {
        call_id: "call_1".into(),
        tool_name: "get_weather".into(),
        arguments: serde_json::json!({ "city": "Tokyo" }),
    }]))]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tokyo weather")).await;

    assert_eq!(outcome.failure, Some(TurnFailure::Tool));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn completed_turn_derives_context_update() {
    let provider = ScriptedProvider::new(vec![
        Ok(tool_response(vec![weather_call(
            "call_1",
            "Tokyo",
            Some("tomorrow"),
        )])),
        Ok(text_response("Mild tomorrow in Tokyo.")),
    ]);
    let outcome = run_turn(&provider, &TableLookup, turn("Tomorrow?")).await;
    let update = context_update_from("Tomorrow?", Language::En, &outcome).unwrap();

    let location = update.location.unwrap();
    assert_eq!(location.city, "Tokyo");
    assert_eq!(location.country, "Japan");
    assert!(location.latitude > 35.0);

    let temporal = update.temporal.unwrap();
    assert_eq!(temporal.timeframe, Timeframe::Forecast);
    assert_eq!(
        temporal.target_date,
        Some(Utc::now().date_naive() + Duration::days(1))
    );

    let conversation = update.conversation.unwrap();
    assert_eq!(conversation.last_query.as_deref(), Some("Tomorrow?"));
}

#[tokio::test]
async fn direct_answer_derives_no_context_update() {
    let provider = ScriptedProvider::new(vec![Ok(text_response("Hi!"))]);
    let outcome = run_turn(&provider, &TableLookup, turn("hello")).await;
    assert!(context_update_from("hello", Language::En, &outcome).is_none());
}
