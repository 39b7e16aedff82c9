//! Request logging with credential redaction
//!
//! `TraceLayer` owns the span; this middleware only emits events inside it.

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::info;

const REDACTED: &str = "[REDACTED]";

pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let query = request.uri().query().map(redact_query).unwrap_or_default();
    let request_id = request_id(request.headers());

    info!(
        method = %method,
        path = %path,
        query = %query,
        request_id = %request_id,
        credentials = has_credentials(request.headers()),
        "Incoming request"
    );

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        request_id = %request_id,
        "Request completed"
    );

    response
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn has_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key("authorization") || headers.contains_key("x-api-key")
}

/// Mask the value of any `api_key` query parameter
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name.eq_ignore_ascii_case("api_key") => {
                format!("{}={}", name, REDACTED)
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
