//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, FailureClass};
use order_store::StoreError;
use thiserror::Error;

use crate::auth::AuthError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed path, header or body.
    BadRequest(String),
    /// Missing or invalid caller identity.
    Unauthenticated(String),
    /// The caller may not act on behalf of another user.
    PermissionDenied(String),
    /// Checkout outcome.
    Checkout(CheckoutError),
}

/// Status, stable error code and retry hint for a checkout failure class.
fn classify(class: FailureClass) -> (StatusCode, &'static str, bool) {
    match class {
        FailureClass::ClientInput => (StatusCode::BAD_REQUEST, "invalid_argument", false),
        FailureClass::PaymentDeclined => (StatusCode::PAYMENT_REQUIRED, "payment_declined", false),
        FailureClass::UpstreamUnavailable | FailureClass::Internal => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", true)
        }
        FailureClass::DeadlineExceeded => (StatusCode::GATEWAY_TIMEOUT, "deadline_exceeded", true),
        FailureClass::AmbiguousPayment => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "payment_outcome_unknown",
            false,
        ),
        FailureClass::PostAuthorizationPersistenceFailure => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "payment_captured_order_not_recorded",
            false,
        ),
        FailureClass::NotFound => (StatusCode::NOT_FOUND, "not_found", false),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, retryable, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_argument", false, msg),
            ApiError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", false, msg)
            }
            ApiError::PermissionDenied(msg) => {
                (StatusCode::FORBIDDEN, "permission_denied", false, msg)
            }
            ApiError::Checkout(err) => {
                let (status, code, retryable) = classify(err.class());
                let message = match &err {
                    // Storage details stay in the logs
                    CheckoutError::Store(inner) => {
                        tracing::error!(error = %inner, "order store failure");
                        "Order store unavailable".to_string()
                    }
                    other => other.to_string(),
                };
                (status, code, retryable, message)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": code,
            "retryable": retryable,
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthenticated(err.to_string())
    }
}

/// Failures while wiring the application together at start-up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to connect to the database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to prepare the order store: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
