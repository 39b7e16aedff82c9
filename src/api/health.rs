//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;
use crate::infrastructure::engine::EngineSummary;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engines: Option<Vec<EngineSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Returns 200 whenever the process is serving
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        engines: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Key store reachability plus per-engine status.
///
/// An unreachable key store makes the gateway unusable when auth is required,
/// so that case reports 503. Engine failures only degrade.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let key_store = if state.gate.repository().is_available().await {
        HealthCheck {
            name: "key_store".to_string(),
            status: HealthStatus::Healthy,
            message: None,
        }
    } else {
        HealthCheck {
            name: "key_store".to_string(),
            status: if state.gate.auth_required() {
                HealthStatus::Unhealthy
            } else {
                HealthStatus::Degraded
            },
            message: Some("API key store unavailable".to_string()),
        }
    };

    let engines = state.registry.engine_statuses().await;
    let engine_failed = engines
        .iter()
        .any(|e| e.initialized && e.status.error.is_some());

    let overall_status = overall(key_store.status, engine_failed);
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![key_store]),
        engines: Some(engines),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let status_code = match overall_status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (status_code, Json(response))
}

fn overall(key_store: HealthStatus, engine_failed: bool) -> HealthStatus {
    match key_store {
        HealthStatus::Unhealthy => HealthStatus::Unhealthy,
        HealthStatus::Degraded => HealthStatus::Degraded,
        HealthStatus::Healthy if engine_failed => HealthStatus::Degraded,
        HealthStatus::Healthy => HealthStatus::Healthy,
    }
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}
