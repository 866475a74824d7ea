// Caller-facing error taxonomy for actions and HTTP handlers
use axum::{http::StatusCode, response::IntoResponse};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::response::ActionResponse;
use crate::database::StoreError;

/// Per-field validation messages, keyed by the camelCase input field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ActionError {
    // 400
    #[error("{message}")]
    Validation { message: String, details: FieldErrors },

    // 401 - no session
    #[error("{0}")]
    Unauthorized(String),

    // 403 - session present but not the owner
    #[error("{0}")]
    Forbidden(String),

    // 404
    #[error("{0}")]
    NotFound(String),

    // 409 - lost a race with a concurrent write; safe to retry
    #[error("{0}")]
    Conflict(String),

    // 503 - storage timed out; safe to retry
    #[error("{0}")]
    Unavailable(String),

    // 500
    #[error("{0}")]
    Internal(String),
}

impl ActionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActionError::Validation { .. } => StatusCode::BAD_REQUEST,
            ActionError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ActionError::Forbidden(_) => StatusCode::FORBIDDEN,
            ActionError::NotFound(_) => StatusCode::NOT_FOUND,
            ActionError::Conflict(_) => StatusCode::CONFLICT,
            ActionError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ActionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ActionError::Validation { .. } => "VALIDATION_ERROR",
            ActionError::Unauthorized(_) => "UNAUTHORIZED",
            ActionError::Forbidden(_) => "FORBIDDEN",
            ActionError::NotFound(_) => "NOT_FOUND",
            ActionError::Conflict(_) => "CONFLICT",
            ActionError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            ActionError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        match self {
            ActionError::Validation { details, .. } if !details.is_empty() => Some(details),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::Conflict(_) | ActionError::Unavailable(_))
    }
}

impl ActionError {
    pub fn validation(message: impl Into<String>, details: FieldErrors) -> Self {
        ActionError::Validation { message: message.into(), details }
    }

    /// Validation error for a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut details = FieldErrors::new();
        details.insert(field.to_string(), vec![message.clone()]);
        ActionError::Validation { message, details }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ActionError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ActionError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ActionError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ActionError::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ActionError::Internal(message.into())
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => {
                tracing::debug!("Storage lookup missed: {}", msg);
                ActionError::not_found("The requested resource was not found")
            }
            StoreError::Conflict(msg) => {
                tracing::warn!("Write conflict: {}", msg);
                ActionError::conflict("The resource was modified concurrently, please retry")
            }
            StoreError::Timeout(msg) => {
                tracing::warn!("Storage timeout: {}", msg);
                ActionError::Unavailable("Storage is busy, please retry".to_string())
            }
            other => {
                // Never expose storage internals to callers
                tracing::error!("Storage error: {}", other);
                ActionError::internal("An error occurred while processing your request")
            }
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> axum::response::Response {
        ActionResponse::<()>::failure(self).into_response()
    }
}
