use std::sync::Arc;

use sky_domain::config::Config;
use sky_providers::CompletionProvider;
use sky_sessions::SessionRegistry;
use sky_weather::WeatherLookup;

use crate::runtime::session_lock::SessionLocks;

/// Shared application state passed to all API handlers.
///
/// Constructed once at process start and handed around by reference —
/// nothing here is resolved through ambient globals, so tests can build
/// an isolated state with scripted provider/lookup fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,
    pub weather: Arc<dyn WeatherLookup>,
    pub sessions: Arc<SessionRegistry>,
    pub session_locks: Arc<SessionLocks>,
}
