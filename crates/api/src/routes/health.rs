//! Liveness probe.

use axum::Json;
use serde::Serialize;

/// Name reported by the liveness probe.
pub const SERVICE_NAME: &str = "checkout";

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// GET /health — reports that the process is serving, without touching
/// any collaborator.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    })
}
