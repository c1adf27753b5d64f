//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The target account has been deactivated.
    #[error("account {0} is deactivated")]
    AccountInactive(String),

    /// The debit would breach the account's overdraft floor.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
        /// Credits missing to cover the debit.
        shortfall: i64,
    },

    /// The per-account lock could not be acquired in time.
    #[error("operation timed out waiting for account {0}")]
    ConcurrencyTimeout(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::AccountInactive(_) => (
                StatusCode::CONFLICT,
                "account_inactive",
                self.to_string(),
                None,
            ),
            Self::InsufficientCredits {
                balance,
                required,
                shortfall,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                self.to_string(),
                Some(serde_json::json!({
                    "current_balance": balance,
                    "required": required,
                    "shortfall": shortfall
                })),
            ),
            Self::ConcurrencyTimeout(_) => (
                StatusCode::CONFLICT,
                "concurrency_timeout",
                self.to_string(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<tollgate_store::StoreError> for ApiError {
    fn from(err: tollgate_store::StoreError) -> Self {
        match err {
            tollgate_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            tollgate_store::StoreError::AccountInactive { account_id } => {
                Self::AccountInactive(account_id)
            }
            tollgate_store::StoreError::InsufficientCredits {
                balance,
                required,
                shortfall,
            } => Self::InsufficientCredits {
                balance,
                required,
                shortfall,
            },
            tollgate_store::StoreError::LockTimeout { account_id } => {
                Self::ConcurrencyTimeout(account_id)
            }
            tollgate_store::StoreError::Validation(msg) => Self::BadRequest(msg),
            tollgate_store::StoreError::Database(msg)
            | tollgate_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
