//! API key management admin endpoints

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{ApiKey, ApiKeyId};
use crate::infrastructure::api_key::CreateApiKeyRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKeyBody {
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    /// Requests per window; the gateway default applies when absent
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<CreateApiKeyBody> for CreateApiKeyRequest {
    fn from(body: CreateApiKeyBody) -> Self {
        let mut request = CreateApiKeyRequest::new(body.name);
        if body.is_admin {
            request = request.admin();
        }
        if let Some(rate_limit) = body.rate_limit {
            request = request.with_rate_limit(rate_limit);
        }
        if let Some(expires_at) = body.expires_at {
            request = request.with_expiration(expires_at);
        }
        request
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListApiKeysParams {
    #[serde(default)]
    pub active_only: bool,
}

/// API key as shown to administrators; never carries the secret or its hash
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub rate_limit: u32,
    pub request_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().as_str().to_string(),
            name: key.name().to_string(),
            is_admin: key.is_admin(),
            is_active: key.is_usable(),
            rate_limit: key.rate_limit(),
            request_count: key.request_count(),
            created_at: key.created_at(),
            last_used_at: key.last_used_at(),
            expires_at: key.expires_at(),
        }
    }
}

/// Returned once, at creation
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyWithSecretResponse {
    #[serde(flatten)]
    pub api_key: ApiKeyResponse,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListApiKeysResponse {
    pub api_keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

fn parse_key_id(key_id: &str) -> Result<ApiKeyId, ApiError> {
    ApiKeyId::new(key_id).map_err(|e| ApiError::bad_request(e.to_string()).with_param("key_id"))
}

/// GET /admin/api-keys
pub async fn list_api_keys(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(params): Query<ListApiKeysParams>,
) -> Result<Json<ListApiKeysResponse>, ApiError> {
    debug!(active_only = params.active_only, "Admin listing API keys");

    let keys = state.api_keys.list(params.active_only).await?;
    let api_keys: Vec<ApiKeyResponse> = keys.iter().map(ApiKeyResponse::from).collect();
    let total = api_keys.len();

    Ok(Json(ListApiKeysResponse { api_keys, total }))
}

/// POST /admin/api-keys
pub async fn create_api_key(
    State(state): State<AppState>,
    RequireAdmin(admission): RequireAdmin,
    Json(body): Json<CreateApiKeyBody>,
) -> Result<Json<ApiKeyWithSecretResponse>, ApiError> {
    debug!(name = %body.name, by = %admission.key_id(), "Admin creating API key");

    let created = state.api_keys.create(body.into()).await?;

    Ok(Json(ApiKeyWithSecretResponse {
        api_key: ApiKeyResponse::from(&created.api_key),
        secret: created.secret,
    }))
}

/// GET /admin/api-keys/{key_id}
pub async fn get_api_key(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let id = parse_key_id(&key_id)?;

    let key = state
        .api_keys
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("API key '{}' not found", key_id)))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

/// DELETE /admin/api-keys/{key_id}
pub async fn delete_api_key(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(key_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_key_id(&key_id)?;

    if !state.api_keys.delete(&id).await? {
        return Err(ApiError::not_found(format!("API key '{}' not found", key_id)));
    }

    Ok(Json(serde_json::json!({
        "deleted": true,
        "id": key_id
    })))
}

/// POST /admin/api-keys/{key_id}/revoke
pub async fn revoke_api_key(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let id = parse_key_id(&key_id)?;

    let key = state.api_keys.revoke(&id).await?;

    Ok(Json(ApiKeyResponse::from(&key)))
}
