//! API Key repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId};
use crate::domain::DomainError;

/// Repository trait for API key storage
///
/// "Not found" is `Ok(None)` / `Ok(false)`. A store that cannot be reached
/// reports `is_available() == false` and fails every other call with
/// `DomainError::RepositoryUnavailable`, never with an empty result.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Look up a key by its plaintext secret.
    ///
    /// Implementations hash the plaintext and compare against the stored hash
    /// in constant time.
    async fn find_by_key(&self, plaintext: &str) -> Result<Option<ApiKey>, DomainError>;

    async fn find_all(&self) -> Result<Vec<ApiKey>, DomainError>;

    async fn find_all_active(&self) -> Result<Vec<ApiKey>, DomainError>;

    /// Insert or replace
    async fn save(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    async fn exists(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Atomically bump `request_count` and set `last_used_at`
    async fn increment_usage(&self, id: &ApiKeyId) -> Result<(), DomainError>;

    async fn is_available(&self) -> bool;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::RwLock;

    use crate::infrastructure::api_key::ApiKeyHasher;

    /// Mock API key repository for testing
    #[derive(Debug, Default)]
    pub struct MockApiKeyRepository {
        keys: Arc<RwLock<HashMap<String, ApiKey>>>,
        unavailable: AtomicBool,
        increment_calls: AtomicUsize,
        increment_delay: RwLock<Option<Duration>>,
        hasher: ApiKeyHasher,
    }

    impl MockApiKeyRepository {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate the backing store going away
        pub fn set_available(&self, available: bool) {
            self.unavailable.store(!available, Ordering::SeqCst);
        }

        /// Make `increment_usage` slow to observe that callers do not wait on it
        pub async fn set_increment_delay(&self, delay: Duration) {
            *self.increment_delay.write().await = Some(delay);
        }

        pub fn increment_calls(&self) -> usize {
            self.increment_calls.load(Ordering::SeqCst)
        }

        fn check_available(&self) -> Result<(), DomainError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(DomainError::repository_unavailable(
                    "Mock repository configured as unavailable",
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ApiKeyRepository for MockApiKeyRepository {
        async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
            self.check_available()?;
            Ok(self.keys.read().await.get(id.as_str()).cloned())
        }

        async fn find_by_key(&self, plaintext: &str) -> Result<Option<ApiKey>, DomainError> {
            self.check_available()?;
            let keys = self.keys.read().await;
            Ok(keys
                .values()
                .find(|k| self.hasher.verify(plaintext, k.secret_hash()))
                .cloned())
        }

        async fn find_all(&self) -> Result<Vec<ApiKey>, DomainError> {
            self.check_available()?;
            Ok(self.keys.read().await.values().cloned().collect())
        }

        async fn find_all_active(&self) -> Result<Vec<ApiKey>, DomainError> {
            self.check_available()?;
            Ok(self
                .keys
                .read()
                .await
                .values()
                .filter(|k| k.is_active())
                .cloned()
                .collect())
        }

        async fn save(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
            self.check_available()?;
            self.keys
                .write()
                .await
                .insert(api_key.id().as_str().to_string(), api_key.clone());
            Ok(api_key)
        }

        async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
            self.check_available()?;
            Ok(self.keys.write().await.remove(id.as_str()).is_some())
        }

        async fn increment_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
            self.check_available()?;
            let delay = *self.increment_delay.read().await;
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.increment_calls.fetch_add(1, Ordering::SeqCst);

            let mut keys = self.keys.write().await;
            match keys.get_mut(id.as_str()) {
                Some(key) => {
                    key.record_usage();
                    Ok(())
                }
                None => Err(DomainError::not_found(format!(
                    "API key '{}' not found",
                    id
                ))),
            }
        }

        async fn is_available(&self) -> bool {
            !self.unavailable.load(Ordering::SeqCst)
        }
    }
}
