//! Member discovery endpoint.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;

use crate::error::ApiError;
use crate::state::AppState;

/// Member id to the ids of the consumers found under it.
pub type MembersResponse = BTreeMap<String, Vec<String>>;

/// Run a discovery pass and list what it found.
///
/// Members without any consumer topic are listed with an empty array.
pub async fn list_members(
    State(state): State<AppState>,
) -> Result<Json<MembersResponse>, ApiError> {
    let membership = state
        .discovery
        .discover()
        .await
        .map_err(ApiError::Discovery)?;

    let response = membership
        .into_iter()
        .map(|(member_id, consumers)| {
            let ids = consumers.into_iter().map(|c| c.id).collect();
            (member_id, ids)
        })
        .collect();

    Ok(Json(response))
}
