//! Cache backend selection.

use crate::{CacheBackend, CacheKey, CachedValue, MemoryCache, NoopCache, RedisCache};
use async_trait::async_trait;
use keystone_config::{CacheConfig, CacheKind};
use keystone_core::{HealthCheck, HealthStatus, KeystoneResult};
use shaku::Component;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn disabled_backend() -> Arc<dyn CacheBackend> {
    Arc::new(NoopCache::default())
}

/// The application's single cache.
///
/// Built once at startup from the cache configuration and then shared by
/// every consumer through the DI container. There is no way to swap the
/// backend afterwards.
#[derive(Component)]
#[shaku(interface = CacheBackend)]
pub struct CacheManager {
    #[shaku(default = disabled_backend())]
    backend: Arc<dyn CacheBackend>,
}

impl CacheManager {
    /// Wraps an already initialized backend.
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Constructs the backend named by `config.kind` and attaches the descriptor.
    ///
    /// The driver is not initialized.
    #[must_use]
    pub fn select(config: &CacheConfig) -> Arc<dyn CacheBackend> {
        let namespace = config.namespace();
        let ttl = config.default_ttl();

        let backend: Arc<dyn CacheBackend> = match config.kind {
            CacheKind::Noop => Arc::new(NoopCache::new(namespace, ttl)),
            CacheKind::Memory => Arc::new(MemoryCache::new(namespace, ttl)),
            CacheKind::Redis => Arc::new(RedisCache::new(namespace, ttl)),
        };
        backend.set_connection(config.clone());
        backend
    }

    /// Selects the backend and initializes its driver.
    pub async fn connect(config: &CacheConfig) -> KeystoneResult<Arc<dyn CacheBackend>> {
        let backend = Self::select(config);
        backend.set_driver().await?;

        info!(
            kind = backend.kind().as_str(),
            namespace = backend.namespace(),
            default_ttl_secs = backend.default_ttl().as_secs(),
            "Cache backend ready"
        );
        Ok(backend)
    }

    /// Builds a manager from configuration.
    pub async fn from_config(config: &CacheConfig) -> KeystoneResult<Self> {
        Ok(Self::new(Self::connect(config).await?))
    }

    /// Returns the selected backend.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.backend)
    }
}

#[async_trait]
impl CacheBackend for CacheManager {
    async fn set_driver(&self) -> KeystoneResult<()> {
        self.backend.set_driver().await
    }

    fn set_connection(&self, descriptor: CacheConfig) {
        self.backend.set_connection(descriptor);
    }

    fn connection(&self) -> CacheConfig {
        self.backend.connection()
    }

    fn kind(&self) -> CacheKind {
        self.backend.kind()
    }

    fn namespace(&self) -> &str {
        self.backend.namespace()
    }

    fn default_ttl(&self) -> Duration {
        self.backend.default_ttl()
    }

    async fn set(&self, key: &CacheKey, value: CachedValue, ttl: Option<Duration>) {
        self.backend.set(key, value, ttl).await;
    }

    async fn get(&self, key: &CacheKey) -> KeystoneResult<CachedValue> {
        self.backend.get(key).await
    }

    async fn delete(&self, key: &CacheKey) -> KeystoneResult<()> {
        self.backend.delete(key).await
    }

    async fn exists(&self, key: &CacheKey) -> KeystoneResult<()> {
        self.backend.exists(key).await
    }

    async fn get_or_set(
        &self,
        key: &CacheKey,
        value: CachedValue,
        ttl: Option<Duration>,
    ) -> KeystoneResult<CachedValue> {
        self.backend.get_or_set(key, value, ttl).await
    }

    async fn ping(&self) -> KeystoneResult<()> {
        self.backend.ping().await
    }
}

#[async_trait]
impl HealthCheck for CacheManager {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> HealthStatus {
        match self.backend.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}
