//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the global Prometheus recorder
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("speech_gateway_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
            tracing::info!("Prometheus metrics initialized at {}", config.path);

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Parameters for synthesis metrics
pub struct SynthesisMetricParams<'a> {
    pub engine: &'a str,
    pub path: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub characters: u64,
    pub audio_bytes: u64,
}

pub fn record_synthesis(params: SynthesisMetricParams) {
    let labels = [
        ("engine", params.engine.to_string()),
        ("path", params.path.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("synthesis_requests_total", &labels).increment(1);
    histogram!("synthesis_duration_seconds", &labels).record(params.duration.as_secs_f64());
    counter!("synthesis_characters_total", &labels).increment(params.characters);

    if params.success {
        counter!("synthesis_audio_bytes_total", &labels).increment(params.audio_bytes);
    } else {
        counter!("synthesis_errors_total", &labels).increment(1);
    }
}

pub fn record_rate_limited() {
    counter!("rate_limit_rejections_total").increment(1);
}

pub fn record_auth_failure() {
    counter!("auth_failures_total").increment(1);
}

/// Usage records written on the request path because the writer queue was full
pub fn record_usage_inline_write() {
    counter!("usage_inline_writes_total").increment(1);
}

pub fn record_usage_evicted(count: u64) {
    counter!("usage_records_evicted_total").increment(count);
}

pub fn record_stream_session(outcome: &'static str) {
    counter!("stream_sessions_total", "outcome" => outcome).increment(1);
}

/// Collapse identifier segments so label cardinality stays bounded
fn sanitize_path(path: &str) -> String {
    let sanitized = path
        .split('/')
        .map(|segment| if looks_like_id(segment) { "{id}" } else { segment })
        .collect::<Vec<_>>()
        .join("/");

    if sanitized.len() > 50 {
        sanitized.chars().take(50).collect()
    } else {
        sanitized
    }
}

fn looks_like_id(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    let numeric = segment.chars().all(|c| c.is_ascii_digit());
    let uuid = segment.len() == 36 && segment.chars().filter(|c| *c == '-').count() == 4;
    let key = segment.starts_with("key-");
    numeric || uuid || key
}
