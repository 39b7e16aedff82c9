//! API Key service
//!
//! Administrative operations on API keys.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::api_key::{
    validate_key_name, validate_rate_limit, ApiKey, ApiKeyId, ApiKeyRepository, DEFAULT_RATE_LIMIT,
};
use crate::domain::DomainError;

use super::hasher::ApiKeyHasher;
use super::rate_limiter::RateLimiter;

/// Parameters for a new key
#[derive(Debug, Clone)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub is_admin: bool,
    pub rate_limit: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateApiKeyRequest {
    /// Create request for a non-admin key with the default rate limit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_admin: false,
            rate_limit: None,
            expires_at: None,
        }
    }

    /// Grant admin rights
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Set requests allowed per window
    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Set expiration time
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Result of creating a new API key
#[derive(Debug)]
pub struct CreateApiKeyResult {
    /// The API key entity (without the secret)
    pub api_key: ApiKey,
    /// The full secret key (only returned once)
    pub secret: String,
}

/// API Key service for managing API keys
#[derive(Debug)]
pub struct ApiKeyService<R>
where
    R: ApiKeyRepository + ?Sized,
{
    repository: Arc<R>,
    hasher: ApiKeyHasher,
    rate_limiter: Arc<RateLimiter>,
}

impl<R: ApiKeyRepository + ?Sized> ApiKeyService<R> {
    /// Create a new API key service
    pub fn new(repository: Arc<R>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            repository,
            hasher: ApiKeyHasher::default(),
            rate_limiter,
        }
    }

    /// Use a custom secret hasher
    pub fn with_hasher(mut self, hasher: ApiKeyHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Create a key with a freshly generated secret
    pub async fn create(
        &self,
        request: CreateApiKeyRequest,
    ) -> Result<CreateApiKeyResult, DomainError> {
        let generated = self.hasher.generate();
        self.store(ApiKeyId::generate(), request, generated.hash, generated.secret)
            .await
    }

    /// Create a key with a known secret (bootstrap admin key, tests)
    pub async fn create_with_secret(
        &self,
        id: ApiKeyId,
        request: CreateApiKeyRequest,
        secret: &str,
    ) -> Result<CreateApiKeyResult, DomainError> {
        if self.repository.exists(&id).await? {
            return Err(DomainError::conflict(format!(
                "API key with ID '{}' already exists",
                id
            )));
        }
        let generated = self.hasher.from_secret(secret);
        self.store(id, request, generated.hash, generated.secret)
            .await
    }

    async fn store(
        &self,
        id: ApiKeyId,
        request: CreateApiKeyRequest,
        hash: String,
        secret: String,
    ) -> Result<CreateApiKeyResult, DomainError> {
        validate_key_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;
        let rate_limit = request.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
        validate_rate_limit(rate_limit).map_err(|e| DomainError::validation(e.to_string()))?;
        if let Some(expires_at) = request.expires_at {
            if expires_at <= Utc::now() {
                return Err(DomainError::validation("expires_at must be in the future"));
            }
        }

        info!(
            "Creating API key: id={}, name={}, admin={}",
            id, request.name, request.is_admin
        );

        let mut api_key = ApiKey::new(id, request.name.trim(), hash)
            .with_admin(request.is_admin)
            .with_rate_limit(rate_limit);
        if let Some(expires_at) = request.expires_at {
            api_key = api_key.with_expiration(expires_at);
        }

        let created = self.repository.save(api_key).await?;

        Ok(CreateApiKeyResult {
            api_key: created,
            secret,
        })
    }

    /// Get an API key by ID
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.find_by_id(id).await
    }

    /// List API keys, optionally only usable ones
    pub async fn list(&self, active_only: bool) -> Result<Vec<ApiKey>, DomainError> {
        if active_only {
            self.repository.find_all_active().await
        } else {
            self.repository.find_all().await
        }
    }

    /// Soft delete: the key stays listed but can no longer authenticate
    pub async fn revoke(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!("Revoking API key: id={}", id);

        let mut key = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))?;

        key.revoke();
        self.rate_limiter.reset(id.as_str());

        self.repository.save(key).await
    }

    /// Hard delete
    pub async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        info!("Deleting API key: id={}", id);

        self.rate_limiter.reset(id.as_str());
        self.repository.delete(id).await
    }
}
