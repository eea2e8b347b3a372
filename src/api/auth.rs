//! Session routes: landing page, login, provider callback, logout, dashboard

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::session::{end_session, issue_login_state, start_session, take_login_state};
use super::{ApiError, ApiResult, AppState, CurrentUser, Session};
use crate::models::{ClassificationRecord, NewUser};

/// Number of classifications shown on the dashboard
pub const DASHBOARD_RECENT: usize = 10;

/// Query string the provider sends back to `/callback`
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    /// Authorization code to exchange
    pub code: Option<String>,
    /// Echo of the `state` issued by `/login`
    pub state: Option<String>,
    /// Provider error code, when sign-in was refused
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /dashboard response
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Display name from the provider
    pub user: String,
    pub picture: Option<String>,
    /// Most recent classifications, newest first
    pub recent: Vec<ClassificationRecord>,
    /// True when the classifier is running without a model
    pub degraded: bool,
}

/// GET /
pub async fn index(user: Option<CurrentUser>) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    Json(json!({
        "message": "Sign in to start sorting your waste",
        "login": "/login",
    }))
    .into_response()
}

/// GET /login
pub async fn login(State(state): State<AppState>, jar: PrivateCookieJar) -> ApiResult<(PrivateCookieJar, Redirect)> {
    let (jar, login_state) = issue_login_state(jar)?;
    let url = state.identity.login(&login_state)?;
    Ok((jar, Redirect::to(&url)))
}

/// GET /callback
pub async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> ApiResult<(PrivateCookieJar, Redirect)> {
    let failed = || ApiError::Unauthorized("Authentication failed. Please try again.".to_string());

    if let Some(error) = &params.error {
        warn!(error = %error, description = ?params.error_description, "Identity provider returned an error");
        return Err(failed());
    }

    let (jar, state_ok) = take_login_state(jar, params.state.as_deref().unwrap_or_default());
    let Some(code) = params.code.filter(|_| state_ok) else {
        warn!("Callback with missing code or unknown state");
        return Err(failed());
    };

    let identity = match state.identity.handle_callback(&code).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "Auth callback error");
            return Err(failed());
        }
    };

    let store = Arc::clone(&state.store);
    let new_user = NewUser::from(&identity);
    let user_id = tokio::task::spawn_blocking(move || store.upsert_user(&new_user)).await??;

    let jar = start_session(jar, &Session::new(user_id, identity))?;
    info!(user_id, "Successfully logged in");

    Ok((jar, Redirect::to("/dashboard")))
}

/// GET /logout
pub async fn logout(State(state): State<AppState>, jar: PrivateCookieJar) -> ApiResult<(PrivateCookieJar, Redirect)> {
    let url = state.identity.logout(&format!("{}/", state.public_url))?;
    Ok((end_session(jar), Redirect::to(&url)))
}

/// GET /dashboard
pub async fn dashboard(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<DashboardResponse>> {
    let store = Arc::clone(&state.store);
    let user_id = user.session.user_id;
    let recent = tokio::task::spawn_blocking(move || store.recent_classifications(user_id, DASHBOARD_RECENT)).await??;

    Ok(Json(DashboardResponse {
        user: user.session.identity.name,
        picture: user.session.identity.picture,
        recent,
        degraded: state.uploads.classifier().is_degraded(),
    }))
}

/// Build session routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", get(logout))
        .route("/dashboard", get(dashboard))
}
