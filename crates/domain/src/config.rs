//! Workspace configuration, deserialized from a TOML file.
//!
//! Every section has serde defaults so a missing file (or a partial one)
//! yields a runnable configuration. The completion provider credential is
//! read from the environment variable named in `[llm]`, never from the file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions endpoint base.
    #[serde(default = "d_llm_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: d_llm_url(),
            api_key_env: d_key_env(),
            model: d_model(),
            temperature: d_temperature(),
            timeout_ms: 30_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Weather data sources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "d_geocoding_url")]
    pub geocoding_url: String,
    /// Current conditions + forecast endpoint.
    #[serde(default = "d_forecast_url")]
    pub forecast_url: String,
    /// Archival endpoint for historical days.
    #[serde(default = "d_archive_url")]
    pub archive_url: String,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            geocoding_url: d_geocoding_url(),
            forecast_url: d_forecast_url(),
            archive_url: d_archive_url(),
            timeout_ms: 10_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Sliding-expiration window.
    #[serde(default = "d_ttl_hours")]
    pub ttl_hours: u32,
    /// Interval of the advisory expiry sweep. `0` disables the sweep
    /// (lazy eviction on access still applies).
    #[serde(default = "d_sweep_secs")]
    pub sweep_interval_secs: u64,
    /// Directory for durable state (the one-shot CLI context snapshot).
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_hours: d_ttl_hours(),
            sweep_interval_secs: d_sweep_secs(),
            state_path: d_state_path(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Structural checks that do not touch the environment or the network.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut err = |message: String| {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message,
            })
        };

        if self.llm.base_url.trim().is_empty() {
            err("llm.base_url is empty".into());
        }
        if self.llm.api_key_env.trim().is_empty() {
            err("llm.api_key_env is empty — no way to resolve the provider credential".into());
        }
        if self.sessions.ttl_hours == 0 {
            err("sessions.ttl_hours is 0 — every session would expire immediately".into());
        }

        if self.sessions.sweep_interval_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "sessions.sweep_interval_secs is 0 — expiry sweep disabled".into(),
            });
        }
        issues
    }
}

// ── serde default helpers ──────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    8710
}
fn d_llm_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_temperature() -> f32 {
    0.7
}
fn d_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".into()
}
fn d_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}
fn d_archive_url() -> String {
    "https://archive-api.open-meteo.com/v1/archive".into()
}
fn d_ttl_hours() -> u32 {
    24
}
fn d_sweep_secs() -> u64 {
    3600
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_10000() -> u64 {
    10_000
}
fn d_30000() -> u64 {
    30_000
}
