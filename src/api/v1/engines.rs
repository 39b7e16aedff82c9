//! Engine discovery endpoints

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::middleware::Authenticated;
use crate::api::state::AppState;
use crate::api::types::{ApiError, EnginesResponse, Json, VoicesResponse};
use crate::domain::EngineId;

/// GET /v1/engines
pub async fn list_engines(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> Result<Json<EnginesResponse>, ApiError> {
    let engines = state.registry.engine_statuses().await;

    Ok(Json(EnginesResponse {
        default_engine: state.router.config().default_engine,
        engines,
    }))
}

/// GET /v1/engines/{engine_id}/voices
pub async fn list_voices(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(engine_id): Path<String>,
) -> Result<Json<VoicesResponse>, ApiError> {
    let engine = EngineId::parse(&engine_id)
        .map_err(|_| ApiError::not_found(format!("Engine '{}' not found", engine_id)))?;
    debug!(engine = %engine, "Listing voices");

    let adapter = state.registry.get_engine(engine).await?;
    let voices = adapter.get_voices().await?;

    Ok(Json(VoicesResponse { engine, voices }))
}
