//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The caller may not act on the named resource.
    Forbidden(String),
    /// Saga execution error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Saga(err) => saga_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    let status = match &err {
        SagaError::Validation(_)
        | SagaError::EmailAlreadyRegistered { .. }
        | SagaError::InvitationExpired { .. }
        | SagaError::Rejected { .. } => StatusCode::BAD_REQUEST,
        SagaError::InvitationNotFound { .. } => StatusCode::NOT_FOUND,
        SagaError::InvalidState { .. } => StatusCode::CONFLICT,
        SagaError::RoleNotFound { .. }
        | SagaError::StepFailed { .. }
        | SagaError::ReadAfterWrite { .. }
        | SagaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "saga failed");
    }
    (status, err.to_string())
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<domain::ValidationError> for ApiError {
    fn from(err: domain::ValidationError) -> Self {
        ApiError::Saga(SagaError::Validation(err))
    }
}
