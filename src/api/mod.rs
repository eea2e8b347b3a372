//! HTTP surface
//!
//! JSON and redirect responses over the upload pipeline, the statistics
//! aggregator and the identity gateway.

pub mod auth;
pub mod error;
pub mod health;
pub mod session;
pub mod stats;
pub mod upload;

pub use error::{ApiError, ApiResult, Flash};
pub use session::{CurrentUser, Session};

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use axum_extra::extract::cookie::Key;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::identity::IdentityGateway;
use crate::repository::RecordStore;
use crate::service::UploadService;
use crate::stats::StatisticsAggregator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub store: Arc<dyn RecordStore>,
    /// Upload pipeline
    pub uploads: Arc<UploadService>,
    /// Statistics over the record store
    pub stats: StatisticsAggregator,
    /// Identity provider
    pub identity: Arc<dyn IdentityGateway>,
    /// Key for the private session and login-state cookies
    pub cookie_key: Key,
    /// Externally visible base URL, without trailing slash
    pub public_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Assemble state; the cookie key is derived from `secret_key`
    pub fn new(
        store: Arc<dyn RecordStore>,
        uploads: Arc<UploadService>,
        identity: Arc<dyn IdentityGateway>,
        secret_key: &str,
        public_url: &str,
    ) -> Self {
        Self {
            stats: StatisticsAggregator::new(Arc::clone(&store)),
            store,
            uploads,
            identity,
            cookie_key: session::session_key(secret_key),
            public_url: public_url.trim_end_matches('/').to_string(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.uploads.policy().max_bytes).unwrap_or(usize::MAX);

    Router::new()
        .merge(auth::auth_routes())
        .merge(upload::upload_routes())
        .merge(stats::stats_routes())
        .merge(health::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
