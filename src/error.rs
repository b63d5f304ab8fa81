//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Reason an API key was denied authorization.
///
/// The reason is logged for observability but never sent to the caller:
/// the key is attacker-controlled input, so the wire response stays
/// generic regardless of which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No key matches the presented secret
    NotFound,
    /// Key exists but has been deactivated
    Inactive,
    /// Key's `expires_at` is in the past
    Expired,
    /// Request IP matches no entry in the key's IP restrictions
    IpNotAllowed,
    /// Requested endpoint matches no allowed-endpoint pattern
    EndpointNotAllowed,
    /// Key is read-only and the operation is a mutation
    ReadOnly,
    /// Key's service scope does not cover the requested service
    ServiceNotAllowed,
}

impl DenyReason {
    /// Stable reason code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::NotFound => "not_found",
            DenyReason::Inactive => "inactive",
            DenyReason::Expired => "expired",
            DenyReason::IpNotAllowed => "ip_not_allowed",
            DenyReason::EndpointNotAllowed => "endpoint_not_allowed",
            DenyReason::ReadOnly => "read_only",
            DenyReason::ServiceNotAllowed => "service_not_allowed",
        }
    }
}

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Validation**: malformed input, reported synchronously with a
///   field-level message, never retried automatically
/// - **AuthDenied**: API key failed one of the ordered authorization checks
/// - **InsufficientFunds**: normal business outcome, not a system fault
/// - **StateConflict**: transition from a terminal state or a lost
///   concurrency race; safe to treat as success-if-already-done
/// - **Internal**: a ledger-affecting write failed after validation passed;
///   always logged loudly, never reported as success
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request with a field-level message.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// API key authorization failed.
    ///
    /// Returns HTTP 401 Unauthorized with a generic message; the precise
    /// reason is only logged.
    #[error("Invalid API key")]
    AuthDenied(DenyReason),

    /// Account balance cannot cover the requested debit.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Operation attempted against a record already in a terminal state.
    ///
    /// Returns HTTP 409 Conflict. Distinguishable from a first-time
    /// failure so idempotent retries can treat it as already-done.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Requested record does not exist or is not visible to the caller.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Account exists but has been deactivated.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Account is inactive")]
    AccountInactive,

    /// A ledger-affecting write failed after validation passed.
    ///
    /// Returns HTTP 500 Internal Server Error (details hidden from client).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }
            AppError::AuthDenied(reason) => {
                // Log the real reason; the response body stays generic.
                tracing::warn!(reason = reason.code(), "authorization denied");
                (
                    StatusCode::UNAUTHORIZED,
                    "invalid_api_key",
                    "Invalid API key".to_string(),
                )
            }
            AppError::InsufficientFunds => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_funds",
                self.to_string(),
            ),
            AppError::StateConflict(ref msg) => {
                (StatusCode::CONFLICT, "state_conflict", msg.clone())
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::AccountInactive => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "account_inactive",
                self.to_string(),
            ),
            AppError::Internal(ref msg) => {
                tracing::error!(detail = %msg, "internal error after validation passed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
