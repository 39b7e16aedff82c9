use std::time::Duration;

use thiserror::Error;

/// Core domain errors
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Rate limited: retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Missing credentials for engine '{engine}'")]
    MissingCredentials { engine: String },

    #[error("Vendor unreachable: {engine} - {message}")]
    VendorUnreachable { engine: String, message: String },

    #[error("Engine '{engine}' does not support {capability}")]
    UnsupportedCapability { engine: String, capability: String },

    #[error("Engine '{engine}' does not support format '{format}'")]
    UnsupportedFormat { engine: String, format: String },

    #[error("Repository unavailable: {message}")]
    RepositoryUnavailable { message: String },

    #[error("Connection closed before any data was received")]
    ClosedBeforeData,

    #[error("Streaming session failed: {message}")]
    SessionFailed { message: String },

    #[error("Timed out after {}ms", elapsed.as_millis())]
    Timeout { elapsed: Duration },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn missing_credentials(engine: impl Into<String>) -> Self {
        Self::MissingCredentials {
            engine: engine.into(),
        }
    }

    pub fn vendor_unreachable(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VendorUnreachable {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_capability(
        engine: impl Into<String>,
        capability: impl Into<String>,
    ) -> Self {
        Self::UnsupportedCapability {
            engine: engine.into(),
            capability: capability.into(),
        }
    }

    pub fn unsupported_format(engine: impl Into<String>, format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            engine: engine.into(),
            format: format.into(),
        }
    }

    pub fn repository_unavailable(message: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            message: message.into(),
        }
    }

    pub fn session_failed(message: impl Into<String>) -> Self {
        Self::SessionFailed {
            message: message.into(),
        }
    }

    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::VendorUnreachable { .. }
                | Self::RepositoryUnavailable { .. }
                | Self::Timeout { .. }
        )
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::RateLimited { .. } => 429,
            Self::MissingCredentials { .. } | Self::RepositoryUnavailable { .. } => 503,
            Self::UnsupportedCapability { .. } | Self::Validation { .. } => 400,
            Self::UnsupportedFormat { .. } => 415,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::VendorUnreachable { .. }
            | Self::Provider { .. }
            | Self::ClosedBeforeData
            | Self::SessionFailed { .. } => 502,
            Self::Timeout { .. } => 504,
            Self::Internal { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DomainError::unauthorized("x").status_code(), 401);
        assert_eq!(
            DomainError::rate_limited(std::time::Duration::from_secs(1)).status_code(),
            429
        );
        assert_eq!(DomainError::missing_credentials("openai").status_code(), 503);
        assert_eq!(
            DomainError::unsupported_format("openai", "wav").status_code(),
            415
        );
        assert_eq!(DomainError::ClosedBeforeData.status_code(), 502);
        assert_eq!(
            DomainError::timeout(std::time::Duration::from_secs(5)).status_code(),
            504
        );
    }

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Engine 'x' not found");
        assert_eq!(error.to_string(), "Not found: Engine 'x' not found");
    }

    #[test]
    fn test_rate_limited_message() {
        let error = DomainError::rate_limited(Duration::from_secs(42));
        assert_eq!(error.to_string(), "Rate limited: retry after 42s");
    }

    #[test]
    fn test_unsupported_capability_message() {
        let error = DomainError::unsupported_capability("openai", "timestamps");
        assert_eq!(
            error.to_string(),
            "Engine 'openai' does not support timestamps"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(DomainError::rate_limited(Duration::from_secs(1)).is_retryable());
        assert!(DomainError::vendor_unreachable("openai", "down").is_retryable());
        assert!(!DomainError::unauthorized("bad key").is_retryable());
        assert!(!DomainError::ClosedBeforeData.is_retryable());
    }
}
