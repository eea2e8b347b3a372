//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the process answers
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Seconds since startup
    pub uptime_seconds: i64,
    /// "model" when inference is available, "stub" otherwise
    pub classifier: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let classifier = if state.uploads.classifier().is_degraded() {
        "stub"
    } else {
        "model"
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.startup_time).num_seconds(),
        classifier,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
