//! API Key entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_api_key_id, ApiKeyValidationError};

/// Default number of requests a key may make per rate-limit window
pub const DEFAULT_RATE_LIMIT: u32 = 60;

/// API Key identifier - alphanumeric + hyphens, max 50 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_api_key_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(format!("key-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// API Key entity
///
/// Holds only the hash of the secret. The plaintext is shown once at creation
/// and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    id: ApiKeyId,
    /// Format: "sha256$<base64url digest>"
    secret_hash: String,
    name: String,
    is_admin: bool,
    active: bool,
    /// Requests allowed per rate-limit window
    rate_limit: u32,
    created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    request_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Create a new active, non-admin API key
    pub fn new(id: ApiKeyId, name: impl Into<String>, secret_hash: impl Into<String>) -> Self {
        Self {
            id,
            secret_hash: secret_hash.into(),
            name: name.into(),
            is_admin: false,
            active: true,
            rate_limit: DEFAULT_RATE_LIMIT,
            created_at: Utc::now(),
            last_used_at: None,
            request_count: 0,
            expires_at: None,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    // Status checks

    /// A key is usable iff it is active and not past its expiry
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    // Mutators

    /// Soft delete
    pub fn revoke(&mut self) {
        self.active = false;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_rate_limit(&mut self, rate_limit: u32) {
        self.rate_limit = rate_limit;
    }

    /// Record one accepted request
    pub fn record_usage(&mut self) {
        self.request_count = self.request_count.saturating_add(1);
        self.last_used_at = Some(Utc::now());
    }
}
