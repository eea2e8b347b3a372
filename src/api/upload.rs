//! Upload routes

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::debug;

use super::{ApiError, ApiResult, AppState, CurrentUser, Flash};
use crate::models::ClassificationRecord;
use crate::service::{UploadOutcome, UploadedFile};

/// Multipart field holding the image
pub const IMAGE_FIELD: &str = "image";

/// GET /upload response
#[derive(Debug, Serialize)]
pub struct UploadForm {
    /// Multipart field name to send the image in
    pub field: &'static str,
    /// Accepted lowercase extensions
    pub allowed_extensions: Vec<String>,
    /// Largest accepted request body
    pub max_bytes: u64,
    /// True when predictions come from the stub
    pub degraded: bool,
}

/// POST /upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Notice for the user
    pub flash: Flash,
    /// The stored record
    pub classification: ClassificationRecord,
}

/// GET /upload
pub async fn upload_form(State(state): State<AppState>, _user: CurrentUser) -> Json<UploadForm> {
    let policy = state.uploads.policy();
    Json(UploadForm {
        field: IMAGE_FIELD,
        allowed_extensions: policy.allowed_extensions.clone(),
        max_bytes: policy.max_bytes,
        degraded: state.uploads.classifier().is_degraded(),
    })
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // A part without a filename is a plain form value, not a file
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        debug!(filename = %filename, size = bytes.len(), "Received image part");
        file = Some(UploadedFile {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let uploads = Arc::clone(&state.uploads);
    let user_id = user.session.user_id;
    let outcome = tokio::task::spawn_blocking(move || uploads.handle_upload(user_id, file)).await??;

    match outcome {
        UploadOutcome::Classified(record) => Ok(Json(UploadResponse {
            flash: Flash::success(format!(
                "Classified as {} ({:.2}% confidence)",
                record.category, record.confidence
            )),
            classification: record,
        })),
        UploadOutcome::Rejected(rejection) => Err(ApiError::BadRequest(rejection.to_string())),
        UploadOutcome::Failed { .. } => Err(ApiError::Unprocessable("Classification failed".to_string())),
    }
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", get(upload_form).post(upload))
}
