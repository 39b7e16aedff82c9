//! Authorization and rate-limit gate
//!
//! Every synthesis request passes through `AuthGate::authorize` before any
//! engine work starts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::api_key::ApiKey;
use crate::domain::usage::ANONYMOUS_KEY_ID;
use crate::domain::{ApiKeyRepository, DomainError};
use crate::infrastructure::api_key::{RateLimitResult, RateLimiter};
use crate::infrastructure::observability::{record_auth_failure, record_rate_limited};

/// Who a request was admitted as
#[derive(Debug, Clone)]
pub enum Principal {
    /// Trusted local mode, no key presented or checked
    Anonymous,
    Key(ApiKey),
}

/// Outcome of a successful gate check
#[derive(Debug, Clone)]
pub struct Admission {
    pub principal: Principal,
    pub rate_limit: Option<RateLimitResult>,
}

impl Admission {
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::Anonymous,
            rate_limit: None,
        }
    }

    pub fn key_id(&self) -> &str {
        match &self.principal {
            Principal::Anonymous => ANONYMOUS_KEY_ID,
            Principal::Key(key) => key.id().as_str(),
        }
    }

    /// Anonymous callers are only admitted in trusted mode, where they act as admin
    pub fn is_admin(&self) -> bool {
        match &self.principal {
            Principal::Anonymous => true,
            Principal::Key(key) => key.is_admin(),
        }
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        match &self.principal {
            Principal::Anonymous => None,
            Principal::Key(key) => Some(key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthGate {
    auth_required: bool,
    repository: Arc<dyn ApiKeyRepository>,
    rate_limiter: Arc<RateLimiter>,
}

impl AuthGate {
    pub fn new(
        auth_required: bool,
        repository: Arc<dyn ApiKeyRepository>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            auth_required,
            repository,
            rate_limiter,
        }
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    pub fn repository(&self) -> &Arc<dyn ApiKeyRepository> {
        &self.repository
    }

    /// Admit or reject a request carrying `presented` as its key.
    ///
    /// On admission the key's usage counter is bumped in a detached task; the
    /// caller never waits for that write.
    pub async fn authorize(&self, presented: Option<&str>) -> Result<Admission, DomainError> {
        if !self.auth_required {
            return Ok(Admission::anonymous());
        }

        let presented = presented.map(str::trim).filter(|k| !k.is_empty());
        let Some(secret) = presented else {
            record_auth_failure();
            return Err(DomainError::unauthorized("Missing API key"));
        };

        let api_key = match self.repository.find_by_key(secret).await? {
            Some(key) => key,
            None => {
                record_auth_failure();
                return Err(DomainError::unauthorized("Invalid API key"));
            }
        };

        if !api_key.is_usable() {
            debug!(key_id = %api_key.id(), "Rejected revoked or expired key");
            record_auth_failure();
            return Err(DomainError::unauthorized(
                "API key is not active or has expired",
            ));
        }

        let result = self
            .rate_limiter
            .check_and_record(api_key.id().as_str(), api_key.rate_limit());

        if !result.allowed {
            debug!(key_id = %api_key.id(), limit = result.limit, "Rate limit exceeded");
            record_rate_limited();
            return Err(DomainError::rate_limited(result.reset_in));
        }

        let repository = self.repository.clone();
        let key_id = api_key.id().clone();
        tokio::spawn(async move {
            if let Err(e) = repository.increment_usage(&key_id).await {
                warn!(key_id = %key_id, error = %e, "Failed to record key usage");
            }
        });

        Ok(Admission {
            principal: Principal::Key(api_key),
            rate_limit: Some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::mock::MockApiKeyRepository;
    use crate::domain::api_key::ApiKeyId;
    use crate::infrastructure::api_key::ApiKeyHasher;
    use std::time::Duration;

    async fn seeded_repo(rate_limit: u32) -> Arc<MockApiKeyRepository> {
        let repo = Arc::new(MockApiKeyRepository::new());
        let hash = ApiKeyHasher::default().from_secret("good-secret").hash;
        let key = ApiKey::new(ApiKeyId::new("key-1").unwrap(), "Kiosk", hash)
            .with_rate_limit(rate_limit);
        repo.save(key).await.unwrap();
        repo
    }

    fn gate(repo: Arc<MockApiKeyRepository>) -> AuthGate {
        AuthGate::new(true, repo, Arc::new(RateLimiter::default()))
    }

    #[tokio::test]
    async fn test_trusted_mode_admits_without_key() {
        let repo = Arc::new(MockApiKeyRepository::new());
        repo.set_available(false);
        let gate = AuthGate::new(false, repo, Arc::new(RateLimiter::default()));

        let admission = gate.authorize(None).await.unwrap();

        assert_eq!(admission.key_id(), ANONYMOUS_KEY_ID);
        assert!(admission.is_admin());
    }

    #[tokio::test]
    async fn test_missing_and_unknown_keys() {
        let gate = gate(seeded_repo(10).await);

        assert!(matches!(
            gate.authorize(None).await,
            Err(DomainError::Unauthorized { .. })
        ));
        assert!(matches!(
            gate.authorize(Some("  ")).await,
            Err(DomainError::Unauthorized { .. })
        ));
        assert!(matches!(
            gate.authorize(Some("wrong")).await,
            Err(DomainError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_valid_key_admitted() {
        let gate = gate(seeded_repo(10).await);

        let admission = gate.authorize(Some("good-secret")).await.unwrap();

        assert_eq!(admission.key_id(), "key-1");
        assert!(!admission.is_admin());
        assert_eq!(admission.rate_limit.unwrap().remaining, 9);
    }

    #[tokio::test]
    async fn test_revoked_key_rejected() {
        let repo = seeded_repo(10).await;
        let mut key = repo
            .find_by_id(&ApiKeyId::new("key-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        key.revoke();
        repo.save(key).await.unwrap();

        let result = gate(repo).authorize(Some("good-secret")).await;
        assert!(matches!(result, Err(DomainError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_expired_key_rejected() {
        let repo = Arc::new(MockApiKeyRepository::new());
        let hash = ApiKeyHasher::default().from_secret("old").hash;
        let key = ApiKey::new(ApiKeyId::new("key-old").unwrap(), "Old", hash)
            .with_expiration(chrono::Utc::now() - chrono::Duration::seconds(1));
        repo.save(key).await.unwrap();

        let result = gate(repo).authorize(Some("old")).await;
        assert!(matches!(result, Err(DomainError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_rate_limit_boundary() {
        let gate = gate(seeded_repo(3).await);

        for _ in 0..3 {
            gate.authorize(Some("good-secret")).await.unwrap();
        }

        match gate.authorize(Some("good-secret")).await {
            Err(DomainError::RateLimited { retry_after }) => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_repository_unavailable_surfaces() {
        let repo = seeded_repo(10).await;
        repo.set_available(false);

        let result = gate(repo).authorize(Some("good-secret")).await;
        assert!(matches!(
            result,
            Err(DomainError::RepositoryUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_usage_increment_is_not_awaited() {
        let repo = seeded_repo(10).await;
        repo.set_increment_delay(Duration::from_millis(500)).await;
        let gate = gate(repo.clone());

        let admission = tokio::time::timeout(
            Duration::from_millis(200),
            gate.authorize(Some("good-secret")),
        )
        .await
        .expect("authorize waited on the usage write");
        assert!(admission.is_ok());
        assert_eq!(repo.increment_calls(), 0);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(repo.increment_calls(), 1);

        let key = repo
            .find_by_id(&ApiKeyId::new("key-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key.request_count(), 1);
        assert!(key.last_used_at().is_some());
    }
}
