//! Redis-based cache implementation.

use crate::metrics::CacheMetrics;
use crate::{CacheBackend, CacheKey, CachedValue};
use async_trait::async_trait;
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Connection, Pool, Runtime};
use keystone_config::{CacheConfig, CacheKind};
use keystone_core::{KeystoneError, KeystoneResult};
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cache backed by Redis.
///
/// Redis enforces expiry itself, so an elapsed TTL is reported as
/// `NotFound` rather than `Expired`. Keys are stored as `namespace:key`.
pub struct RedisCache {
    namespace: String,
    default_ttl: Duration,
    connection: RwLock<CacheConfig>,
    pool: RwLock<Option<Pool>>,
}

impl RedisCache {
    /// Creates a cache; no connection is made until [`CacheBackend::set_driver`].
    #[must_use]
    pub fn new(namespace: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            connection: RwLock::new(CacheConfig::default()),
            pool: RwLock::new(None),
        }
    }

    /// True once a pool has been created.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    fn redis_key(&self, key: &CacheKey) -> Vec<u8> {
        key.namespaced(&self.namespace)
    }

    fn build_pool(descriptor: &CacheConfig) -> KeystoneResult<Pool> {
        let url = descriptor.connection_url()?;

        Config::from_url(url)
            .builder()
            .map_err(|e| KeystoneError::Configuration(format!("Invalid Redis config: {}", e)))?
            .max_size(descriptor.pool_size)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| KeystoneError::Configuration(format!("Failed to create pool: {}", e)))
    }

    async fn get_conn(&self) -> KeystoneResult<Connection> {
        let pool = self.pool.read().clone().ok_or_else(|| {
            KeystoneError::Connectivity("Redis cache driver is not initialized".to_string())
        })?;
        Ok(pool.get().await?)
    }

    async fn try_set(&self, key: &CacheKey, value: &CachedValue, ttl: Duration) -> KeystoneResult<()> {
        let payload = serde_json::to_string(value)?;
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.get_conn().await?;

        let started = Instant::now();
        conn.set_ex::<_, _, ()>(self.redis_key(key), payload, ttl_secs)
            .await?;
        CacheMetrics::operation("set", started.elapsed());

        debug!("Cached key '{}' with TTL {}s", key, ttl_secs);
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn set_driver(&self) -> KeystoneResult<()> {
        if self.is_connected() {
            return Ok(());
        }

        let descriptor = self.connection();
        let pool = Self::build_pool(&descriptor)?;

        let mut slot = self.pool.write();
        if slot.is_none() {
            info!("Redis cache pool created for namespace '{}'", self.namespace);
            *slot = Some(pool);
        }
        Ok(())
    }

    fn set_connection(&self, descriptor: CacheConfig) {
        *self.connection.write() = descriptor;
    }

    fn connection(&self) -> CacheConfig {
        self.connection.read().clone()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Redis
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn set(&self, key: &CacheKey, value: CachedValue, ttl: Option<Duration>) {
        let kind = CacheKind::Redis.as_str();
        match self.try_set(key, &value, ttl.unwrap_or(self.default_ttl)).await {
            Ok(()) => CacheMetrics::set(kind),
            Err(e) => {
                CacheMetrics::write_failed(kind);
                warn!("Dropped cache write for key '{}': {}", key, e);
            }
        }
    }

    async fn get(&self, key: &CacheKey) -> KeystoneResult<CachedValue> {
        let mut conn = self.get_conn().await?;

        let started = Instant::now();
        let raw: Option<String> = conn.get(self.redis_key(key)).await?;
        CacheMetrics::operation("get", started.elapsed());

        let kind = CacheKind::Redis.as_str();
        match raw {
            Some(raw) => {
                CacheMetrics::hit(kind, &self.namespace);
                debug!("Cache hit for key '{}'", key);
                serde_json::from_str(&raw).map_err(|e| KeystoneError::TypeMismatch {
                    expected: "JSON value",
                    found: e.to_string(),
                })
            }
            None => {
                CacheMetrics::miss(kind, &self.namespace, "not_found");
                debug!("Cache miss for key '{}'", key);
                Err(KeystoneError::not_found("cache", key))
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> KeystoneResult<()> {
        self.exists(key).await?;

        let mut conn = self.get_conn().await?;
        let deleted: i64 = conn.del(self.redis_key(key)).await?;
        if deleted == 0 {
            // expired between the existence check and the delete
            return Err(KeystoneError::not_found("cache", key));
        }

        CacheMetrics::delete(CacheKind::Redis.as_str());
        debug!("Deleted key '{}'", key);
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> KeystoneResult<()> {
        let mut conn = self.get_conn().await?;
        let exists: bool = conn.exists(self.redis_key(key)).await?;
        if exists {
            Ok(())
        } else {
            Err(KeystoneError::not_found("cache", key))
        }
    }

    async fn ping(&self) -> KeystoneResult<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING").query_async::<String>(&mut *conn).await?;
        Ok(())
    }
}
