//! AppState construction, background-task spawning, and the server loop.

use std::sync::Arc;

use anyhow::Context;

use sky_domain::config::{Config, ConfigSeverity};
use sky_providers::OpenAiCompatProvider;
use sky_sessions::SessionRegistry;
use sky_weather::WeatherService;

use crate::api;
use crate::runtime::session_lock::SessionLocks;
use crate::state::AppState;

/// Validate config and wire every subsystem into an [`AppState`].
///
/// A missing provider credential fails here, before any turn is
/// processed — it is the one fatal configuration error.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Completion provider ──────────────────────────────────────
    let provider = Arc::new(
        OpenAiCompatProvider::from_config(&config.llm)
            .context("initializing completion provider")?,
    );
    tracing::info!(base_url = %config.llm.base_url, model = %config.llm.model, "completion provider ready");

    // ── Weather service ──────────────────────────────────────────
    let weather = Arc::new(
        WeatherService::from_config(&config.weather).context("initializing weather service")?,
    );
    tracing::info!(forecast_url = %config.weather.forecast_url, "weather service ready");

    // ── Sessions ─────────────────────────────────────────────────
    let sessions = Arc::new(SessionRegistry::new(config.sessions.ttl_hours));
    let session_locks = Arc::new(SessionLocks::new());
    tracing::info!(ttl_hours = config.sessions.ttl_hours, "session registry ready");

    Ok(AppState {
        config,
        provider,
        weather,
        sessions,
        session_locks,
    })
}

/// Spawn the advisory expiry sweep. Lazy eviction on access keeps the
/// registry correct even if this never runs.
pub fn spawn_sweeper(state: &AppState) {
    let interval_secs = state.config.sessions.sweep_interval_secs;
    if interval_secs == 0 {
        return;
    }
    let sessions = state.sessions.clone();
    let locks = state.session_locks.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        // The first tick fires immediately; skip it.
        tick.tick().await;
        loop {
            tick.tick().await;
            sessions.sweep();
            locks.prune_idle();
        }
    });
}

/// Boot the full gateway and serve until shutdown.
pub async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("skychat starting");

    let state = build_app_state(config.clone())?;
    spawn_sweeper(&state);

    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "skychat listening");

    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
