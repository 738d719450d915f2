//! Error types for registrationd

use crate::users::UserError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use registration_policy::{PolicyError, StoreError};
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// User storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Policy engine error
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// User storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Backend could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query failed
    #[error("Query error: {0}")]
    Query(String),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or invalid request
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Conflict with existing state
    #[error("{0}")]
    Conflict(String),

    /// Password rejected by the policy
    #[error("password does not meet requirements")]
    InvalidPassword,

    /// Policy engine error
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// User storage error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ApiError {
    /// Status code and the message safe to show to callers.
    fn public_parts(&self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message.clone()),
            ApiError::InvalidPassword => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Policy(err) => policy_parts(err),
            ApiError::Storage(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        }
    }
}

fn policy_parts(err: &PolicyError) -> (StatusCode, String) {
    match err {
        PolicyError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
        PolicyError::Inconsistent { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        PolicyError::Unavailable => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "password policy unavailable".to_string(),
        ),
        PolicyError::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "request timed out".to_string(),
        ),
        PolicyError::Store(StoreError::Unavailable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "service temporarily unavailable".to_string(),
        ),
        PolicyError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        ),
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(message) => ApiError::BadRequest(message),
            UserError::DuplicateEmail => ApiError::Conflict(err.to_string()),
            UserError::InvalidPassword => ApiError::InvalidPassword,
            UserError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            // A broken policy is the operator's problem, not the registrant's.
            UserError::Policy(PolicyError::Inconsistent { min_len, max_len }) => {
                tracing::error!(min_len, max_len, "Registration blocked by inconsistent password policy");
                ApiError::Policy(PolicyError::Unavailable)
            }
            UserError::Policy(err) => ApiError::Policy(err),
            UserError::Storage(err) => ApiError::Storage(err),
            UserError::Credentials(message) => ApiError::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(ErrorResponse { message })).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(status(ApiError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(ApiError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(ApiError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status(ApiError::InvalidPassword), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ApiError::Unauthorized("x".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_policy_error_status_codes() {
        let cases = [
            (PolicyError::NotFound("parameter k".into()), StatusCode::NOT_FOUND),
            (
                PolicyError::Inconsistent {
                    min_len: 40,
                    max_len: 30,
                },
                StatusCode::BAD_REQUEST,
            ),
            (PolicyError::Unavailable, StatusCode::INTERNAL_SERVER_ERROR),
            (
                PolicyError::Timeout(Duration::from_secs(5)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                PolicyError::Store(StoreError::Unavailable("pool timed out".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                PolicyError::Store(StoreError::Conflict("duplicate key".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PolicyError::Store(StoreError::Backend("syntax error at or near".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status(ApiError::Policy(err)), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = ApiError::Policy(PolicyError::Store(StoreError::Conflict(
            "duplicate key value violates unique constraint \"parameter_active_key\"".into(),
        )));
        let (_, message) = err.public_parts();
        assert_eq!(message, "internal server error");
    }

    #[test]
    fn test_inconsistent_policy_during_registration_is_a_server_error() {
        let err = ApiError::from(UserError::Policy(PolicyError::Inconsistent {
            min_len: 40,
            max_len: 30,
        }));
        assert_eq!(status(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
