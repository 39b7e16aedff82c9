//! Engine registry
//!
//! Owns every constructed adapter. Entries are keyed by engine and credential
//! fingerprint, built on first use and dropped only by `dispose_engine`.

use std::sync::Arc;

use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::{
    resolve_credentials, CredentialResolution, CredentialSource, DomainError, EngineAdapter,
    EngineCapabilities, EngineCredentials, EngineFactory, EngineId, EngineStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    engine: EngineId,
    fingerprint: String,
}

/// Status row for one supported engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub engine: EngineId,
    pub requires_key: bool,
    /// Deployment defaults exist for this engine
    pub configured: bool,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<EngineCapabilities>,
    pub status: EngineStatus,
}

#[derive(Debug)]
pub struct EngineRegistry {
    factory: Arc<dyn EngineFactory>,
    credentials: Arc<dyn CredentialSource>,
    cache: Cache<CacheKey, Arc<dyn EngineAdapter>>,
}

impl EngineRegistry {
    pub fn new(factory: Arc<dyn EngineFactory>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            factory,
            credentials,
            // Unbounded: adapters leave the cache only through `dispose_engine`
            cache: Cache::builder().build(),
        }
    }

    /// Return the adapter for `engine`, building and initializing it on first use.
    ///
    /// Concurrent callers for the same engine and credentials share a single
    /// construction. A failed `initialize` is recorded in the adapter status
    /// and the adapter is still returned.
    pub async fn create_engine(
        &self,
        engine: EngineId,
        credentials: Option<EngineCredentials>,
    ) -> Result<Arc<dyn EngineAdapter>, DomainError> {
        let resolution = resolve_credentials(credentials, self.credentials.default_credentials(engine));

        if engine.requires_key() && resolution == CredentialResolution::Missing {
            return Err(DomainError::missing_credentials(engine.as_str()));
        }

        let key = CacheKey {
            engine,
            fingerprint: resolution.fingerprint(),
        };
        let source = resolution.source();
        let factory = self.factory.clone();

        self.cache
            .try_get_with(key, async move {
                info!(engine = %engine, credentials = source, "Constructing engine adapter");
                let adapter = factory.create(engine, resolution.into_credentials())?;

                if let Err(e) = adapter.initialize().await {
                    warn!(engine = %engine, error = %e, "Engine initialization failed");
                }

                Ok::<_, DomainError>(adapter)
            })
            .await
            .map_err(|e: Arc<DomainError>| (*e).clone())
    }

    /// Adapter for `engine` using deployment defaults
    pub async fn get_engine(&self, engine: EngineId) -> Result<Arc<dyn EngineAdapter>, DomainError> {
        self.create_engine(engine, None).await
    }

    /// Every supported engine, whether or not it can be built right now
    pub fn get_available_engines(&self) -> Vec<EngineId> {
        EngineId::ALL.to_vec()
    }

    /// Engines that can be built with the current default credentials
    pub fn get_configured_engines(&self) -> Vec<EngineId> {
        EngineId::ALL
            .into_iter()
            .filter(|engine| {
                !engine.requires_key() || self.credentials.default_credentials(*engine).is_some()
            })
            .collect()
    }

    pub fn is_engine_supported(&self, engine: &str) -> bool {
        EngineId::parse(engine).is_ok()
    }

    /// Any cached adapter for `engine`, without constructing one
    pub fn get_cached_engine(&self, engine: EngineId) -> Option<Arc<dyn EngineAdapter>> {
        let default_key = CacheKey {
            engine,
            fingerprint: resolve_credentials(None, self.credentials.default_credentials(engine))
                .fingerprint(),
        };

        self.cache.iter().find_map(|(key, adapter)| {
            (key.engine == engine && key.fingerprint == default_key.fingerprint).then_some(adapter)
        })
        .or_else(|| {
            self.cache
                .iter()
                .find_map(|(key, adapter)| (key.engine == engine).then_some(adapter))
        })
    }

    /// Engines with at least one cached adapter that initialized successfully
    pub async fn get_initialized_engines(&self) -> Vec<EngineId> {
        let adapters: Vec<Arc<dyn EngineAdapter>> =
            self.cache.iter().map(|(_, adapter)| adapter).collect();

        let mut engines = Vec::new();
        for adapter in adapters {
            if adapter.get_status().await.available && !engines.contains(&adapter.engine_id()) {
                engines.push(adapter.engine_id());
            }
        }
        engines.sort_by_key(|e| e.as_str());
        engines
    }

    /// Drop every cached adapter for `engine`. Returns how many were removed.
    pub async fn dispose_engine(&self, engine: EngineId) -> usize {
        let keys: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(key, _)| key.engine == engine)
            .map(|(key, _)| (*key).clone())
            .collect();

        for key in &keys {
            self.cache.invalidate(key).await;
        }

        info!(engine = %engine, removed = keys.len(), "Disposed engine adapters");
        keys.len()
    }

    pub async fn engine_statuses(&self) -> Vec<EngineSummary> {
        let mut summaries = Vec::with_capacity(EngineId::ALL.len());

        for engine in EngineId::ALL {
            let cached = self.get_cached_engine(engine);
            let (status, capabilities) = match &cached {
                Some(adapter) => (adapter.get_status().await, Some(adapter.capabilities())),
                None => (EngineStatus::uninitialized(), None),
            };
            debug!(engine = %engine, available = status.available, "Engine status");

            summaries.push(EngineSummary {
                engine,
                requires_key: engine.requires_key(),
                configured: self.credentials.default_credentials(engine).is_some(),
                initialized: cached.is_some(),
                capabilities,
                status,
            });
        }

        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::mock::MockEngineFactory;
    use crate::infrastructure::engine::EnvCredentialSource;
    use std::time::Duration;

    fn registry_with(factory: MockEngineFactory, source: EnvCredentialSource) -> EngineRegistry {
        EngineRegistry::new(Arc::new(factory), Arc::new(source))
    }

    fn with_openai_default() -> EnvCredentialSource {
        EnvCredentialSource::new()
            .with_credentials(EngineId::OpenAi, EngineCredentials::new("env-key"))
    }

    #[tokio::test]
    async fn test_concurrent_creation_constructs_once() {
        let factory = MockEngineFactory::new().with_init_delay(Duration::from_millis(50));
        let counters = factory.counters.clone();
        let registry = Arc::new(registry_with(factory, EnvCredentialSource::new()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.create_engine(EngineId::Synthetic, None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(counters.created(), 1);
        assert_eq!(counters.initialized(), 1);
    }

    #[tokio::test]
    async fn test_cached_adapter_reused() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, with_openai_default());

        let first = registry.get_engine(EngineId::OpenAi).await.unwrap();
        let second = registry.get_engine(EngineId::OpenAi).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counters.created(), 1);
    }

    #[tokio::test]
    async fn test_explicit_credentials_get_their_own_adapter() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, with_openai_default());

        let default = registry.get_engine(EngineId::OpenAi).await.unwrap();
        let explicit = registry
            .create_engine(EngineId::OpenAi, Some(EngineCredentials::new("caller-key")))
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&default, &explicit));
        assert_eq!(counters.created(), 2);
    }

    #[tokio::test]
    async fn test_missing_credentials_for_keyed_engine() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, EnvCredentialSource::new());

        let result = registry.create_engine(EngineId::ElevenLabs, None).await;

        assert!(matches!(result, Err(DomainError::MissingCredentials { .. })));
        assert_eq!(counters.created(), 0);
    }

    #[tokio::test]
    async fn test_init_failure_is_isolated() {
        let factory = MockEngineFactory::new().with_failing(EngineId::OpenAi);
        let registry = registry_with(factory, with_openai_default());

        let failing = registry.get_engine(EngineId::OpenAi).await.unwrap();
        let status = failing.get_status().await;
        assert!(!status.available);
        assert!(status.error.is_some());

        let healthy = registry.get_engine(EngineId::Synthetic).await.unwrap();
        assert!(healthy.get_status().await.available);

        assert_eq!(
            registry.get_initialized_engines().await,
            vec![EngineId::Synthetic]
        );
    }

    #[tokio::test]
    async fn test_lookup_does_not_construct() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, EnvCredentialSource::new());

        assert!(registry.get_cached_engine(EngineId::Synthetic).is_none());
        assert!(registry.get_initialized_engines().await.is_empty());
        assert_eq!(counters.created(), 0);

        registry.get_engine(EngineId::Synthetic).await.unwrap();
        assert!(registry.get_cached_engine(EngineId::Synthetic).is_some());
    }

    #[tokio::test]
    async fn test_dispose_forces_reconstruction() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, EnvCredentialSource::new());

        registry.get_engine(EngineId::Synthetic).await.unwrap();
        assert_eq!(registry.dispose_engine(EngineId::Synthetic).await, 1);
        assert!(registry.get_cached_engine(EngineId::Synthetic).is_none());

        registry.get_engine(EngineId::Synthetic).await.unwrap();
        assert_eq!(counters.created(), 2);
    }

    #[tokio::test]
    async fn test_many_credential_sets_stay_cached() {
        let factory = MockEngineFactory::new();
        let counters = factory.counters.clone();
        let registry = registry_with(factory, EnvCredentialSource::new());

        for round in 0..2 {
            for i in 0..300 {
                registry
                    .create_engine(EngineId::OpenAi, Some(EngineCredentials::new(format!("key-{}", i))))
                    .await
                    .unwrap();
            }
            registry.cache.run_pending_tasks().await;
            assert_eq!(registry.cache.entry_count(), 300, "round {}", round);
        }

        assert_eq!(counters.created(), 300);
    }

    #[tokio::test]
    async fn test_available_and_supported() {
        let registry = registry_with(MockEngineFactory::new(), with_openai_default());

        assert_eq!(registry.get_available_engines(), EngineId::ALL.to_vec());
        assert_eq!(
            registry.get_configured_engines(),
            vec![EngineId::OpenAi, EngineId::Synthetic]
        );
        assert!(registry.is_engine_supported("ElevenLabs"));
        assert!(!registry.is_engine_supported("espeak"));

        let bare = registry_with(MockEngineFactory::new(), EnvCredentialSource::new());
        assert_eq!(bare.get_available_engines(), EngineId::ALL.to_vec());
        assert_eq!(bare.get_configured_engines(), vec![EngineId::Synthetic]);
    }

    #[tokio::test]
    async fn test_engine_statuses_cover_all_engines() {
        let registry = registry_with(MockEngineFactory::new(), EnvCredentialSource::new());
        registry.get_engine(EngineId::Synthetic).await.unwrap();

        let statuses = registry.engine_statuses().await;

        assert_eq!(statuses.len(), EngineId::ALL.len());
        let synthetic = statuses
            .iter()
            .find(|s| s.engine == EngineId::Synthetic)
            .unwrap();
        assert!(synthetic.initialized);
        assert!(synthetic.status.available);

        let openai = statuses.iter().find(|s| s.engine == EngineId::OpenAi).unwrap();
        assert!(!openai.initialized);
        assert!(!openai.configured);
        assert_eq!(openai.status, EngineStatus::uninitialized());
    }
}
