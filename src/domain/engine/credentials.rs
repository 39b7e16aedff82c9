//! Engine credentials and precedence resolution

use sha2::{Digest, Sha256};

use super::EngineId;

/// Opaque credential blob handed to an engine adapter
#[derive(Clone, PartialEq, Eq)]
pub struct EngineCredentials {
    api_key: String,
    base_url: Option<String>,
}

impl EngineCredentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Point the adapter at a different vendor host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Stable, non-reversible identifier used in adapter cache keys
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api_key.as_bytes());
        hasher.update([0u8]);
        if let Some(base_url) = &self.base_url {
            hasher.update(base_url.as_bytes());
        }
        hex::encode(&hasher.finalize()[..8])
    }
}

impl std::fmt::Debug for EngineCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCredentials")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Outcome of credential precedence resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialResolution {
    /// Supplied by the caller
    Explicit(EngineCredentials),
    /// Taken from the deployment's defaults
    Default(EngineCredentials),
    Missing,
}

impl CredentialResolution {
    pub fn credentials(&self) -> Option<&EngineCredentials> {
        match self {
            Self::Explicit(credentials) | Self::Default(credentials) => Some(credentials),
            Self::Missing => None,
        }
    }

    pub fn into_credentials(self) -> Option<EngineCredentials> {
        match self {
            Self::Explicit(credentials) | Self::Default(credentials) => Some(credentials),
            Self::Missing => None,
        }
    }

    pub fn fingerprint(&self) -> String {
        self.credentials()
            .map(EngineCredentials::fingerprint)
            .unwrap_or_else(|| "none".to_string())
    }

    pub fn source(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::Default(_) => "default",
            Self::Missing => "missing",
        }
    }
}

/// Explicit credentials always win over deployment defaults
pub fn resolve_credentials(
    explicit: Option<EngineCredentials>,
    default: Option<EngineCredentials>,
) -> CredentialResolution {
    match (explicit, default) {
        (Some(credentials), _) => CredentialResolution::Explicit(credentials),
        (None, Some(credentials)) => CredentialResolution::Default(credentials),
        (None, None) => CredentialResolution::Missing,
    }
}

/// Supplies deployment-wide default credentials per engine
pub trait CredentialSource: Send + Sync + std::fmt::Debug {
    fn default_credentials(&self, engine: EngineId) -> Option<EngineCredentials>;
}
