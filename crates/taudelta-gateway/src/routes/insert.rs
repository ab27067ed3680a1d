//! Tau/delta ingest endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use taudelta_core::metrics::increment;
use taudelta_core::{InsertRequest, TauDelta};

use crate::error::ApiError;
use crate::state::AppState;

/// Successful insert response, echoing the accepted values.
#[derive(Debug, Clone, Serialize)]
pub struct InsertResponse {
    message: &'static str,
    #[serde(flatten)]
    accepted: TauDelta,
}

/// Persist one tau/delta measurement.
///
/// Any body that does not parse into the expected shape is answered the same
/// way as one that parses but fails validation.
pub async fn insert_tau_delta(
    State(state): State<AppState>,
    body: Result<Json<InsertRequest>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        increment("ingest_rejected_total", 1);
        tracing::debug!(error = %rejection, "unreadable insert body");
        ApiError::InvalidRequest
    })?;

    let accepted = state.ingestor.ingest(request).await?;

    Ok(Json(InsertResponse {
        message: "Data inserted successfully",
        accepted,
    }))
}
