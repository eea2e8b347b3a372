//! Error responses for the HTTP surface
//!
//! Every failure reaches the client as a flash-style JSON body.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::error::WasteSorterError;

/// User-facing notice, the JSON counterpart of a flashed message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    /// "success" or "error"
    pub category: &'static str,
    /// Message to show
    pub message: String,
}

impl Flash {
    /// Failure notice
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            category: "error",
            message: message.into(),
        }
    }

    /// Success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: "success",
            message: message.into(),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Understood but could not be processed (422)
    #[error("{0}")]
    Unprocessable(String),

    /// Sign-in failed (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed or oversized multipart body
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// Store, IO or identity failure
    #[error(transparent)]
    Service(#[from] WasteSorterError),

    /// A blocking task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Multipart(ref err) => (err.status(), err.body_text()),
            Self::Service(ref err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong, please try again".to_string())
            }
            Self::Join(ref err) => {
                error!(error = %err, "Request task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong, please try again".to_string())
            }
        };

        (status, Json(Flash::error(message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
