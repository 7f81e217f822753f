//! API route handlers.

use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde_json::{json, Value};
use tracing::error;

use ecs_sd_core::types::TargetGroup;

use crate::state::AppState;

/// Body written when the target list cannot be encoded.
const EMPTY_TARGETS: &str = "[]";

/// GET /prometheus-targets
///
/// Always answers 200 with a JSON array. A failed aggregation pass is logged
/// and served as an empty list so Prometheus keeps polling.
pub async fn prometheus_targets(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let groups = match state.discovery.build_targets().await {
        Ok(groups) => groups,
        Err(err) => {
            error!(error = %err, "build scrape config failed");
            Vec::new()
        }
    };

    ([(header::CONTENT_TYPE, "application/json")], encode_targets(&groups))
}

/// Encodes target groups as indented JSON, falling back to `[]`.
pub(crate) fn encode_targets(groups: &[TargetGroup]) -> String {
    match serde_json::to_string_pretty(groups) {
        Ok(body) => body,
        Err(err) => {
            error!(error = %err, "encoding scrape config failed");
            EMPTY_TARGETS.to_string()
        }
    }
}

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
