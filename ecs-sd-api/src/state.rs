//! App state: discovery pipeline and server settings.

use std::time::Duration;

use ecs_sd_core::constants::SHUTDOWN_GRACE_PERIOD;
use ecs_sd_discovery::Discovery;

/// HTTP server settings.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// How long in-flight requests may run after a shutdown signal
    pub shutdown_grace_period: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_period: SHUTDOWN_GRACE_PERIOD,
        }
    }
}

/// Shared state handed to every request handler.
pub struct AppState {
    /// Aggregator run once per scrape request
    pub discovery: Discovery,
}

impl AppState {
    /// Creates the handler state.
    pub fn new(discovery: Discovery) -> Self {
        Self { discovery }
    }
}
