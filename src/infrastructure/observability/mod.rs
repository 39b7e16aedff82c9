//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_auth_failure, record_http_request,
    record_rate_limited, record_stream_session, record_synthesis, record_usage_evicted,
    record_usage_inline_write, PrometheusMetrics, SynthesisMetricParams,
};
