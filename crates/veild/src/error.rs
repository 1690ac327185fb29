//! Request-scoped errors and their HTTP mapping.
//!
//! Every variant renders as `{"error": "<message>"}`. None of them are fatal to
//! the daemon.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};
use veil_common::{BackendError, RequestProblem};

use crate::guard::GuardError;

#[derive(Debug, thiserror::Error)]
pub enum SanitizeError {
    #[error("No JSON data provided")]
    NoJson,

    #[error("No text provided")]
    NoText,

    /// Body rejected before parsing (too large, unreadable)
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Ollama backend is not available")]
    BackendUnavailable,

    #[error("AI processing timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{0}")]
    Internal(String),
}

impl SanitizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            SanitizeError::NoJson | SanitizeError::NoText => StatusCode::BAD_REQUEST,
            SanitizeError::Rejected { status, .. } => *status,
            SanitizeError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            SanitizeError::BackendUnavailable
            | SanitizeError::Backend(_)
            | SanitizeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RequestProblem> for SanitizeError {
    fn from(problem: RequestProblem) -> Self {
        match problem {
            RequestProblem::NoBody => SanitizeError::NoJson,
            RequestProblem::NoText => SanitizeError::NoText,
        }
    }
}

impl From<GuardError<BackendError>> for SanitizeError {
    fn from(err: GuardError<BackendError>) -> Self {
        match err {
            GuardError::Timeout(_) => SanitizeError::Timeout(err.to_string()),
            GuardError::Failed(e) => SanitizeError::Backend(e),
            other => SanitizeError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for SanitizeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("  Sanitize failed: {}", self);
        } else {
            warn!("  Sanitize rejected ({}): {}", status.as_u16(), self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
