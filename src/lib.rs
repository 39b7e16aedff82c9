//! Speech Gateway
//!
//! One authenticated HTTP and WebSocket front for several text-to-speech engines:
//! - Per-key authentication and fixed-window rate limiting
//! - Lazily built, cached engine adapters (OpenAI, ElevenLabs, a local test tone)
//! - Batch, timestamped and streamed synthesis with a shared WebSocket protocol
//! - Usage metering off the request path

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::{ApiKeyId, CredentialSource, EngineFactory};
use infrastructure::{
    api_key::{CreateApiKeyRequest, InMemoryApiKeyRepository},
    engine::{DefaultEngineFactory, EnvCredentialSource},
    usage::InMemoryUsageRepository,
};
use tracing::{info, warn};

const BOOTSTRAP_ADMIN_KEY_ID: &str = "admin";

/// Build the application state from configuration and the process environment
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let credentials = EnvCredentialSource::new().with_defaults().load();
    for engine in credentials.configured_engines() {
        info!(engine = %engine, "Vendor credentials found");
    }

    let factory = DefaultEngineFactory::with_connect_timeout(Duration::from_secs(
        config.engines.connect_timeout_secs,
    ));

    create_app_state_with(config, Arc::new(factory), Arc::new(credentials)).await
}

/// Build the application state with explicit engine wiring
pub async fn create_app_state_with(
    config: &AppConfig,
    factory: Arc<dyn EngineFactory>,
    credentials: Arc<dyn CredentialSource>,
) -> anyhow::Result<AppState> {
    let keys = Arc::new(InMemoryApiKeyRepository::new());
    let usage = Arc::new(InMemoryUsageRepository::new(config.usage.max_records));

    let state = AppState::build(config, keys, usage, factory, credentials);

    match &config.auth.admin_key {
        Some(secret) => seed_admin_key(&state, secret).await?,
        None if config.auth.required => {
            warn!("No admin key configured; admin endpoints are unreachable");
        }
        None => info!("Authentication disabled, running in trusted local mode"),
    }

    Ok(state)
}

async fn seed_admin_key(state: &AppState, secret: &str) -> anyhow::Result<()> {
    let id = ApiKeyId::new(BOOTSTRAP_ADMIN_KEY_ID)?;
    let created = state
        .api_keys
        .create_with_secret(id, CreateApiKeyRequest::new("Admin Key").admin(), secret)
        .await?;

    info!("Admin API key created with ID: {}", created.api_key.id());
    Ok(())
}
