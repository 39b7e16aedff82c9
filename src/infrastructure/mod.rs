//! Infrastructure layer: adapters, stores and transports behind the domain traits

pub mod api_key;
pub mod auth;
pub mod engine;
pub mod logging;
pub mod observability;
pub mod routing;
pub mod streaming;
pub mod usage;
