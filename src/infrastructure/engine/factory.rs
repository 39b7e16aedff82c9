use std::sync::Arc;
use std::time::Duration;

use super::elevenlabs::{ElevenLabsEngine, DEFAULT_ELEVENLABS_BASE_URL};
use super::http_client::HttpClient;
use super::openai::{OpenAiEngine, DEFAULT_OPENAI_BASE_URL};
use super::synthetic::SyntheticEngine;
use crate::domain::{DomainError, EngineAdapter, EngineCredentials, EngineFactory, EngineId};

/// Builds the concrete adapter for each supported engine
#[derive(Debug, Clone)]
pub struct DefaultEngineFactory {
    http_client: HttpClient,
}

impl DefaultEngineFactory {
    pub fn new() -> Self {
        Self {
            http_client: HttpClient::new(),
        }
    }

    /// Bound the time spent establishing vendor connections
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::with_timeout(timeout),
        }
    }

    fn require(
        engine: EngineId,
        credentials: Option<EngineCredentials>,
    ) -> Result<EngineCredentials, DomainError> {
        credentials.ok_or_else(|| DomainError::missing_credentials(engine.as_str()))
    }
}

impl Default for DefaultEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create(
        &self,
        engine: EngineId,
        credentials: Option<EngineCredentials>,
    ) -> Result<Arc<dyn EngineAdapter>, DomainError> {
        match engine {
            EngineId::OpenAi => {
                let credentials = Self::require(engine, credentials)?;
                let base_url = credentials.base_url().unwrap_or(DEFAULT_OPENAI_BASE_URL);
                Ok(Arc::new(OpenAiEngine::with_base_url(
                    self.http_client.clone(),
                    credentials.api_key(),
                    base_url,
                )))
            }

            EngineId::ElevenLabs => {
                let credentials = Self::require(engine, credentials)?;
                let base_url = credentials
                    .base_url()
                    .unwrap_or(DEFAULT_ELEVENLABS_BASE_URL);
                Ok(Arc::new(ElevenLabsEngine::with_base_url(
                    self.http_client.clone(),
                    credentials.api_key(),
                    base_url,
                )))
            }

            EngineId::Synthetic => Ok(Arc::new(SyntheticEngine::new())),
        }
    }
}
