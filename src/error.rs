use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::session::state::SessionState;

pub type Result<T> = std::result::Result<T, Error>;

/// Why the session refused to enter `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionFailure {
    #[error("camera access was denied")]
    CameraDenied,
    #[error("fullscreen was denied")]
    FullscreenDenied,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Precondition failed: {0}")]
    Precondition(PreconditionFailure),

    #[error("Could not start attempt: {0}")]
    StartFailed(String),

    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Responses are not accepted while the session is {0:?}")]
    NotAccepting(SessionState),

    #[error("Finalize failed: {0}")]
    FinalizeFailed(String),

    #[error("Assignment has already been completed")]
    AlreadyCompleted,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Retryable failures the candidate can act on without reloading.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Precondition(_) | Error::StartFailed(_) | Error::FinalizeFailed(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let retryable = self.is_retryable();
        let (status, error_message) = match self {
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Error::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Error::Reqwest(err) => (StatusCode::BAD_GATEWAY, format!("External service error: {}", err)),
            Error::Upstream { status, body } => (
                StatusCode::BAD_GATEWAY,
                format!("External service returned {}: {}", status, body),
            ),
            Error::Precondition(reason) => (StatusCode::PRECONDITION_FAILED, reason.to_string()),
            Error::StartFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            err @ Error::InvalidTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            err @ Error::NotAccepting(_) => (StatusCode::CONFLICT, err.to_string()),
            err @ Error::AlreadyCompleted => (StatusCode::CONFLICT, err.to_string()),
            Error::FinalizeFailed(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Error::SessionClosed => (StatusCode::GONE, "Session is closed".to_string()),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred".to_string(),
            ),
        };

        let body = Json(json!({ "error": error_message, "retryable": retryable }));
        (status, body).into_response()
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::SessionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::SessionClosed
    }
}
