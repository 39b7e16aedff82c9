//! Layered application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, EnginesConfig, LogFormat, LoggingConfig, MetricsConfig, ServerConfig,
    UsageConfig,
};
