//! Usage reporting admin endpoints

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{EngineId, UsageRecord, UsageStats};

const DEFAULT_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct UsageQueryParams {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub key_id: Option<String>,
    pub engine: Option<EngineId>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct UsageListResponse {
    pub records: Vec<UsageRecord>,
    /// Matches before `limit` was applied
    pub total: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQueryParams {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct ClearUsageParams {
    pub older_than: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ClearUsageResponse {
    pub removed: usize,
    pub older_than: DateTime<Utc>,
}

/// GET /admin/usage
pub async fn list_usage(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(params): Query<UsageQueryParams>,
) -> Result<Json<UsageListResponse>, ApiError> {
    let records = state.usage.get_usage(params.since, params.until).await?;

    let matching: Vec<UsageRecord> = records
        .into_iter()
        .filter(|r| params.key_id.as_deref().is_none_or(|k| r.key_id() == k))
        .filter(|r| params.engine.is_none_or(|e| r.engine() == e))
        .collect();
    let total = matching.len();

    // Newest first
    let records = matching
        .into_iter()
        .rev()
        .take(params.limit.unwrap_or(DEFAULT_LIMIT))
        .collect();

    Ok(Json(UsageListResponse { records, total }))
}

/// GET /admin/usage/stats
pub async fn usage_stats(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(params): Query<StatsQueryParams>,
) -> Result<Json<UsageStats>, ApiError> {
    Ok(Json(state.usage.get_stats(params.since).await?))
}

/// DELETE /admin/usage?older_than=
pub async fn clear_usage(
    State(state): State<AppState>,
    RequireAdmin(admission): RequireAdmin,
    Query(params): Query<ClearUsageParams>,
) -> Result<Json<ClearUsageResponse>, ApiError> {
    info!(by = %admission.key_id(), older_than = %params.older_than, "Admin clearing usage");

    let removed = state.usage.clear_old_records(params.older_than).await?;

    Ok(Json(ClearUsageResponse {
        removed,
        older_than: params.older_than,
    }))
}
