//! Health check endpoint.

use axum::Json;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Liveness probe. Does not touch the store.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
