//! Command-line interface: `serve` (default), a one-shot `run` turn that
//! exercises the file-backed context store, and `version`.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sky_domain::chat::{Language, Message};
use sky_domain::config::Config;
use sky_providers::OpenAiCompatProvider;
use sky_sessions::{ContextStore, FilePersistence};
use sky_weather::WeatherService;

use crate::runtime::turn::context_update_from;
use crate::runtime::{resolve_query, run_turn, TurnRequest};
use crate::runtime::prompts;

/// skychat — a conversational weather assistant gateway.
#[derive(Debug, Parser)]
#[command(name = "skychat", version, about)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the gateway server (default when no subcommand is given).
    Serve,
    /// Send a single message and print the response. Context persists
    /// across invocations in the state directory, so follow-ups like
    /// "Tomorrow?" keep working from the terminal.
    Run {
        /// The message to send.
        message: String,
        /// Response language ("en" or "ja").
        #[arg(long, default_value = "en")]
        language: String,
        /// Discard any persisted context before running.
        #[arg(long)]
        fresh: bool,
    },
    /// Print version information.
    Version,
}

/// Load the config file, falling back to defaults when it is absent.
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).with_context(|| format!("parsing {path}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path, "no config file — using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading {path}")),
    }
}

/// One-shot turn from the terminal, sharing the orchestrator with the
/// HTTP path but backed by the persisted context snapshot instead of a
/// server-side session.
pub async fn run_oneshot(
    config: Arc<Config>,
    message: String,
    language: String,
    fresh: bool,
) -> anyhow::Result<()> {
    let language = match language.as_str() {
        "ja" => Language::Ja,
        _ => Language::En,
    };

    let provider =
        OpenAiCompatProvider::from_config(&config.llm).context("initializing completion provider")?;
    let weather =
        WeatherService::from_config(&config.weather).context("initializing weather service")?;

    let mut store = ContextStore::initialize(Box::new(FilePersistence::new(
        &config.sessions.state_path,
    )));
    if fresh {
        store.reset();
    }
    let snapshot = store.snapshot();

    let resolution = resolve_query(&message, language, snapshot.location.current.as_ref());
    if resolution.needs_location_input {
        println!("{}", prompts::clarify_location(language));
        return Ok(());
    }

    // Replay the previous exchange so elliptical follow-ups resolve.
    let mut history = Vec::new();
    if !snapshot.conversation.last_query.is_empty() {
        history.push(Message::user(&snapshot.conversation.last_query));
        if let Some(last) = &snapshot.conversation.last_response {
            history.push(Message::assistant(last));
        }
    }

    let outcome = run_turn(
        &provider,
        &weather,
        TurnRequest {
            history,
            query: resolution.contextual_query,
            language,
            context_hint: Some(snapshot.summarize()),
        },
    )
    .await;

    if outcome.failure.is_none() {
        if let Some(update) = context_update_from(&message, language, &outcome) {
            store.merge(update);
        }
    }

    println!("{}", outcome.response);
    Ok(())
}
