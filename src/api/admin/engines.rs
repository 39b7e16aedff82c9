//! Engine lifecycle admin endpoints

use axum::extract::{Path, State};
use serde::Serialize;
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::EngineId;

#[derive(Debug, Serialize)]
pub struct DisposeResponse {
    pub engine: EngineId,
    /// Cached instances dropped, one per credential set
    pub disposed: usize,
}

/// POST /admin/engines/{engine_id}/dispose
///
/// Drops every cached instance so the next request rebuilds and re-initializes.
pub async fn dispose_engine(
    State(state): State<AppState>,
    RequireAdmin(admission): RequireAdmin,
    Path(engine_id): Path<String>,
) -> Result<Json<DisposeResponse>, ApiError> {
    let engine = EngineId::parse(&engine_id)
        .map_err(|_| ApiError::not_found(format!("Engine '{}' not found", engine_id)))?;

    let disposed = state.registry.dispose_engine(engine).await;
    info!(engine = %engine, disposed, by = %admission.key_id(), "Engine disposed");

    Ok(Json(DisposeResponse { engine, disposed }))
}
