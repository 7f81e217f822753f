//! API route configuration.

use std::sync::Arc;

use axum::{routing::get, Router};

use ecs_sd_core::constants::TARGETS_PATH;

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Prometheus HTTP SD
        .route(TARGETS_PATH, get(handlers::prometheus_targets))
        .with_state(state)
}
