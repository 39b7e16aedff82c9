use std::time::Duration;

use serde::Deserialize;

use crate::domain::EngineId;
use crate::infrastructure::routing::{FormatPolicy, RouterConfig};
use crate::infrastructure::usage::DEFAULT_BUFFER_SIZE;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub engines: EnginesConfig,
    pub usage: UsageConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is admitted as the anonymous caller
    pub required: bool,
    /// Secret seeded as an admin key at startup
    pub admin_key: Option<String>,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnginesConfig {
    pub default_engine: EngineId,
    pub format_policy: FormatPolicy,
    pub request_timeout_secs: u64,
    pub stream_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    pub buffer_size: usize,
    /// Cap on stored records; zero leaves retention to `retention_days`
    pub max_records: usize,
    /// Zero disables the retention task
    pub retention_days: u32,
    pub retention_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            required: true,
            admin_key: None,
            rate_limit_window_secs: 60,
        }
    }
}

impl Default for EnginesConfig {
    fn default() -> Self {
        let router = RouterConfig::default();
        Self {
            default_engine: router.default_engine,
            format_policy: router.format_policy,
            request_timeout_secs: router.request_timeout.as_secs(),
            stream_timeout_secs: router.stream_timeout.as_secs(),
            connect_timeout_secs: 10,
        }
    }
}

impl EnginesConfig {
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            default_engine: self.default_engine,
            format_policy: self.format_policy,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_records: 0,
            retention_days: 30,
            retention_interval_secs: 3600,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert!(config.auth.required);
        assert_eq!(config.engines.default_engine, EngineId::Synthetic);
        assert_eq!(config.usage.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.metrics.path, "/metrics");
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[engines]\ndefault_engine = \"openai\"\nformat_policy = \"passthrough\"\n\n[logging]\nformat = \"json\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.engines.default_engine, EngineId::OpenAi);
        assert_eq!(config.engines.format_policy, FormatPolicy::Passthrough);
        assert_eq!(config.engines.request_timeout_secs, 30);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_router_config_conversion() {
        let engines = EnginesConfig {
            request_timeout_secs: 5,
            ..EnginesConfig::default()
        };

        let router = engines.router_config();
        assert_eq!(router.request_timeout, Duration::from_secs(5));
        assert_eq!(router.stream_timeout, Duration::from_secs(120));
    }
}
