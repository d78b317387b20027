//! Caller authentication and per-request context extraction.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use checkout::RequestContext;
use common::{IdParseError, UserId};
use thiserror::Error;
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the caller identity resolved by the upstream auth gateway.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying a caller-supplied deadline in milliseconds.
pub const TIMEOUT_HEADER: &str = "x-request-timeout-ms";
/// Header carrying the key that makes a payment safe to retry.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
/// Header carrying an upstream request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing caller identity")]
    Missing,

    #[error("Invalid caller identity: {0}")]
    Invalid(#[from] IdParseError),
}

/// Resolves the caller of a request.
///
/// Token issuance and validation live outside this service; implementations
/// only read what the gateway in front of it established.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<UserId, AuthError>;
}

/// Trusts the user id forwarded by the gateway in `x-user-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedHeaderAuthenticator;

impl Authenticator for TrustedHeaderAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let value = headers
            .get(USER_ID_HEADER)
            .ok_or(AuthError::Missing)?
            .to_str()
            .map_err(|_| AuthError::Missing)?;
        Ok(UserId::parse(value)?)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Deadline for this request: the caller's wish, capped, or the default.
pub fn request_timeout(headers: &HeaderMap, default: Duration, max: Duration) -> Duration {
    header(headers, TIMEOUT_HEADER)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(|ms| Duration::from_millis(ms).min(max))
        .unwrap_or(default)
}

/// An authenticated request, resolved once before any handler logic runs.
pub struct Authenticated(pub RequestContext);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let caller = state
            .authenticator
            .authenticate(&parts.headers)
            .inspect_err(|_| metrics::counter!("api_unauthenticated_requests_total").increment(1))?;
        let timeout = request_timeout(
            &parts.headers,
            state.request_timeout,
            state.max_request_timeout,
        );

        let mut ctx = RequestContext::new(timeout).caller(caller);
        if let Some(key) = header(&parts.headers, IDEMPOTENCY_KEY_HEADER) {
            ctx = ctx.idempotency_key(key);
        }
        if let Some(id) = header(&parts.headers, REQUEST_ID_HEADER).and_then(|v| Uuid::parse_str(v).ok()) {
            ctx = ctx.request_id(id);
        }

        Ok(Authenticated(ctx))
    }
}
