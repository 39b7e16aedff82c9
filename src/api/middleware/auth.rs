//! API key extractors

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap},
};
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::infrastructure::auth::Admission;

/// A request admitted by the auth gate.
///
/// The key is read from, in order:
/// - Authorization header: `Bearer <api_key>`
/// - X-API-Key header: `<api_key>`
/// - `?api_key=` query parameter (for WebSocket clients that cannot set headers)
#[derive(Debug, Clone)]
pub struct Authenticated(pub Admission);

/// An admitted request whose key carries the admin flag
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Admission);

#[derive(Debug, Deserialize)]
struct KeyQuery {
    api_key: Option<String>,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = match extract_api_key_from_headers(&parts.headers)? {
            Some(key) => Some(key),
            None => Query::<KeyQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(q)| q.api_key),
        };

        if let Some(key) = &presented {
            debug!(
                key_prefix = %key.chars().take(8).collect::<String>(),
                "Validating API key"
            );
        }

        let admission = state.gate.authorize(presented.as_deref()).await?;
        Ok(Authenticated(admission))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(admission) = Authenticated::from_request_parts(parts, state).await?;

        if !admission.is_admin() {
            return Err(ApiError::forbidden("Admin API key required"));
        }

        Ok(RequireAdmin(admission))
    }
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(Some(token.trim().to_string()));
        }
    }

    if let Some(api_key_header) = headers.get("x-api-key") {
        let key = api_key_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-API-Key header encoding"))?;

        return Ok(Some(key.trim().to_string()));
    }

    Ok(None)
}
