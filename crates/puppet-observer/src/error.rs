//! Error types for the observer API.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response carrying the same
//! `{success, reason, data}` envelope as successful calls.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use puppet_core::CoreError;

/// Errors that can occur in the observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body or parameters were invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A collaborator (content generator or platform) failed.
    #[error("collaborator failed: {0}")]
    Collaborator(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A control operation was requested but no run control is attached.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ObserverError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::UnknownAgent(id) => Self::NotFound(format!("agent {id}")),
            CoreError::Collaborator { source } => Self::Collaborator(source.to_string()),
            CoreError::Agent { source } => Self::InvalidRequest(source.to_string()),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Collaborator(_) => StatusCode::BAD_GATEWAY,
            Self::Serialization(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "success": false,
            "reason": self.to_string(),
            "data": null,
        });

        (status, axum::Json(body)).into_response()
    }
}
