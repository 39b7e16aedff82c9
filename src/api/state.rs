//! Shared services handed to every handler

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::domain::{ApiKeyRepository, CredentialSource, EngineFactory, UsageRepository};
use crate::infrastructure::api_key::{ApiKeyService, RateLimiter};
use crate::infrastructure::auth::AuthGate;
use crate::infrastructure::engine::EngineRegistry;
use crate::infrastructure::routing::SynthesisRouter;
use crate::infrastructure::usage::UsageRecorder;

/// Lifecycle-scoped services; cloned per request
#[derive(Debug, Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub router: Arc<SynthesisRouter>,
    pub registry: Arc<EngineRegistry>,
    pub api_keys: Arc<ApiKeyService<dyn ApiKeyRepository>>,
    pub usage: Arc<UsageRecorder>,
}

impl AppState {
    /// Wire the services together. Spawns the usage writer, so it must run
    /// inside a Tokio runtime.
    pub fn build(
        config: &AppConfig,
        keys: Arc<dyn ApiKeyRepository>,
        usage: Arc<dyn UsageRepository>,
        factory: Arc<dyn EngineFactory>,
        credentials: Arc<dyn CredentialSource>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_secs(
            config.auth.rate_limit_window_secs,
        )));
        let gate = Arc::new(AuthGate::new(
            config.auth.required,
            keys.clone(),
            rate_limiter.clone(),
        ));
        let api_keys = Arc::new(ApiKeyService::new(keys, rate_limiter));

        let registry = Arc::new(EngineRegistry::new(factory, credentials));
        let usage = Arc::new(UsageRecorder::new(usage, config.usage.buffer_size));
        let router = Arc::new(SynthesisRouter::new(
            registry.clone(),
            usage.clone(),
            config.engines.router_config(),
        ));

        Self {
            gate,
            router,
            registry,
            api_keys,
            usage,
        }
    }
}
