//! In-memory API key repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use super::ApiKeyHasher;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;

/// In-memory implementation of ApiKeyRepository
#[derive(Debug)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<String, ApiKey>>>,
    available: AtomicBool,
    hasher: ApiKeyHasher,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
            available: AtomicBool::new(true),
            hasher: ApiKeyHasher::default(),
        }
    }

    /// Create a repository with initial keys
    pub fn with_keys(keys: Vec<ApiKey>) -> Self {
        let keys_map = keys
            .into_iter()
            .map(|k| (k.id().as_str().to_string(), k))
            .collect();

        Self {
            keys: Arc::new(RwLock::new(keys_map)),
            ..Self::new()
        }
    }

    /// Mark the store reachable or not; used by health checks and tests
    pub fn set_available(&self, available: bool) {
        if !available {
            warn!("API key store marked unavailable");
        }
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(DomainError::repository_unavailable("API key store is unavailable"));
        }
        Ok(())
    }
}

impl Default for InMemoryApiKeyRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.check_available()?;
        let keys = self.keys.read().await;
        Ok(keys.get(id.as_str()).cloned())
    }

    async fn find_by_key(&self, plaintext: &str) -> Result<Option<ApiKey>, DomainError> {
        self.check_available()?;
        let keys = self.keys.read().await;

        // Visit every key so lookup time does not depend on where the match is
        let mut found = None;
        for key in keys.values() {
            if self.hasher.verify(plaintext, key.secret_hash()) && found.is_none() {
                found = Some(key.clone());
            }
        }
        Ok(found)
    }

    async fn find_all(&self) -> Result<Vec<ApiKey>, DomainError> {
        self.check_available()?;
        let keys = self.keys.read().await;

        let mut result: Vec<ApiKey> = keys.values().cloned().collect();
        result.sort_by_key(|k| k.created_at());
        Ok(result)
    }

    async fn find_all_active(&self) -> Result<Vec<ApiKey>, DomainError> {
        Ok(self
            .find_all()
            .await?
            .into_iter()
            .filter(|k| k.is_active())
            .collect())
    }

    async fn save(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        self.check_available()?;
        let mut keys = self.keys.write().await;
        keys.insert(api_key.id().as_str().to_string(), api_key.clone());
        Ok(api_key)
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        self.check_available()?;
        let mut keys = self.keys.write().await;
        Ok(keys.remove(id.as_str()).is_some())
    }

    async fn increment_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        self.check_available()?;
        let mut keys = self.keys.write().await;

        if let Some(key) = keys.get_mut(id.as_str()) {
            key.record_usage();
            Ok(())
        } else {
            Err(DomainError::not_found(format!("API key '{}' not found", id)))
        }
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn create_key(id: &str, secret: &str) -> ApiKey {
        let hash = ApiKeyHasher::default().hash(secret);
        ApiKey::new(ApiKeyId::new(id).unwrap(), format!("Key {}", id), hash)
    }

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_key("key-1", "secret-1");

        repo.save(key.clone()).await.unwrap();

        let found = repo.find_by_id(key.id()).await.unwrap().unwrap();
        assert_eq!(found.name(), "Key key-1");
        assert!(repo.exists(key.id()).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let repo = InMemoryApiKeyRepository::new();
        let mut key = create_key("key-1", "secret-1");
        repo.save(key.clone()).await.unwrap();

        key.set_name("Renamed");
        repo.save(key.clone()).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 1);
        assert_eq!(
            repo.find_by_id(key.id()).await.unwrap().unwrap().name(),
            "Renamed"
        );
    }

    #[tokio::test]
    async fn test_find_by_key_matches_only_correct_secret() {
        let repo = InMemoryApiKeyRepository::with_keys(vec![
            create_key("key-1", "secret-1"),
            create_key("key-2", "secret-2"),
        ]);

        let found = repo.find_by_key("secret-2").await.unwrap().unwrap();
        assert_eq!(found.id().as_str(), "key-2");

        assert!(repo.find_by_key("secret-3").await.unwrap().is_none());
        assert!(repo.find_by_key("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_key_rejects_stored_hash_as_plaintext() {
        let key = create_key("key-1", "secret-1");
        let stored_hash = key.secret_hash().to_string();
        let repo = InMemoryApiKeyRepository::with_keys(vec![key]);

        assert!(repo.find_by_key(&stored_hash).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_active() {
        let mut revoked = create_key("key-2", "secret-2");
        revoked.revoke();
        let repo =
            InMemoryApiKeyRepository::with_keys(vec![create_key("key-1", "secret-1"), revoked]);

        assert_eq!(repo.find_all().await.unwrap().len(), 2);
        let active = repo.find_all_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id().as_str(), "key-1");
    }

    #[tokio::test]
    async fn test_find_all_active_keeps_expired_but_active_keys() {
        let expired = create_key("key-1", "s").with_expiration(Utc::now() - Duration::hours(1));
        let repo = InMemoryApiKeyRepository::with_keys(vec![expired]);

        let active = repo.find_all_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(!active[0].is_usable());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_key("key-1", "secret-1");
        repo.save(key.clone()).await.unwrap();

        assert!(repo.delete(key.id()).await.unwrap());
        assert!(!repo.delete(key.id()).await.unwrap());
        assert!(repo.find_by_id(key.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let repo = InMemoryApiKeyRepository::new();
        let key = create_key("key-1", "secret-1");
        repo.save(key.clone()).await.unwrap();

        repo.increment_usage(key.id()).await.unwrap();
        repo.increment_usage(key.id()).await.unwrap();

        let found = repo.find_by_id(key.id()).await.unwrap().unwrap();
        assert_eq!(found.request_count(), 2);
        assert!(found.last_used_at().is_some());
    }

    #[tokio::test]
    async fn test_increment_usage_concurrent() {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let key = create_key("key-1", "secret-1");
        repo.save(key.clone()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = repo.clone();
            let id = key.id().clone();
            handles.push(tokio::spawn(async move {
                repo.increment_usage(&id).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let found = repo.find_by_id(key.id()).await.unwrap().unwrap();
        assert_eq!(found.request_count(), 50);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_instead_of_returning_empty() {
        let repo = InMemoryApiKeyRepository::with_keys(vec![create_key("key-1", "secret-1")]);
        repo.set_available(false);

        assert!(!repo.is_available().await);
        assert!(matches!(
            repo.find_by_key("secret-1").await,
            Err(DomainError::RepositoryUnavailable { .. })
        ));
        assert!(matches!(
            repo.find_all().await,
            Err(DomainError::RepositoryUnavailable { .. })
        ));
        assert!(matches!(
            repo.exists(&ApiKeyId::new("key-1").unwrap()).await,
            Err(DomainError::RepositoryUnavailable { .. })
        ));

        repo.set_available(true);
        assert!(repo.find_by_key("secret-1").await.unwrap().is_some());
    }
}
