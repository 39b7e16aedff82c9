//! API middleware components

pub mod auth;
pub mod logging;
pub mod metrics;

pub use auth::{Authenticated, RequireAdmin};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
