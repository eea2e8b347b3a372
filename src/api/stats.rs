//! Statistics routes

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::{ApiResult, AppState, CurrentUser};
use crate::stats::{BasicStats, EcoStats, LegacyCounts};

/// GET /stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Display name of the signed-in user
    pub user: String,
    /// Totals and recycling rate
    #[serde(flatten)]
    pub stats: BasicStats,
    /// Older three-bucket view of the same counts
    #[serde(flatten)]
    pub legacy: LegacyCounts,
}

/// GET /eco_stats response
#[derive(Debug, Serialize)]
pub struct EcoStatsResponse {
    /// Display name of the signed-in user
    pub user: String,
    /// Estimated savings
    #[serde(flatten)]
    pub eco: EcoStats,
}

/// GET /stats
pub async fn stats(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<StatsResponse>> {
    let aggregator = state.stats.clone();
    let user_id = user.session.user_id;
    let stats = tokio::task::spawn_blocking(move || aggregator.basic_stats(user_id)).await??;

    Ok(Json(StatsResponse {
        user: user.session.identity.name,
        legacy: LegacyCounts::from(&stats.per_category),
        stats,
    }))
}

/// GET /eco_stats
pub async fn eco_stats(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<EcoStatsResponse>> {
    let aggregator = state.stats.clone();
    let user_id = user.session.user_id;
    let eco = tokio::task::spawn_blocking(move || aggregator.eco_stats(user_id)).await??;

    Ok(Json(EcoStatsResponse {
        user: user.session.identity.name,
        eco,
    }))
}

/// Build statistics routes
pub fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/eco_stats", get(eco_stats))
}
