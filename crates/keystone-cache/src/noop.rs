//! Cache backend that stores nothing.

use crate::{CacheBackend, CacheKey, CachedValue};
use async_trait::async_trait;
use keystone_config::{CacheConfig, CacheKind, DEFAULT_CACHE_NAMESPACE};
use keystone_core::{KeystoneError, KeystoneResult};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::trace;

/// Disabled cache.
///
/// Mutations succeed and do nothing, reads always miss, and `get_or_set`
/// hands back the value it was given. Lets the read-through layer run with
/// caching turned off without changing call sites.
#[derive(Debug)]
pub struct NoopCache {
    namespace: String,
    default_ttl: Duration,
    connection: RwLock<CacheConfig>,
}

impl NoopCache {
    /// Creates a no-op cache for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            connection: RwLock::new(CacheConfig {
                kind: CacheKind::Noop,
                ..CacheConfig::default()
            }),
        }
    }
}

impl Default for NoopCache {
    fn default() -> Self {
        let config = CacheConfig::default();
        Self::new(DEFAULT_CACHE_NAMESPACE, config.default_ttl())
    }
}

#[async_trait]
impl CacheBackend for NoopCache {
    async fn set_driver(&self) -> KeystoneResult<()> {
        Ok(())
    }

    fn set_connection(&self, descriptor: CacheConfig) {
        *self.connection.write() = descriptor;
    }

    fn connection(&self) -> CacheConfig {
        self.connection.read().clone()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Noop
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn set(&self, key: &CacheKey, _value: CachedValue, _ttl: Option<Duration>) {
        trace!("noop cache dropped write for '{}'", key);
    }

    async fn get(&self, key: &CacheKey) -> KeystoneResult<CachedValue> {
        Err(KeystoneError::not_found("cache", key))
    }

    async fn delete(&self, _key: &CacheKey) -> KeystoneResult<()> {
        Ok(())
    }

    async fn exists(&self, key: &CacheKey) -> KeystoneResult<()> {
        Err(KeystoneError::not_found("cache", key))
    }

    async fn get_or_set(
        &self,
        _key: &CacheKey,
        value: CachedValue,
        _ttl: Option<Duration>,
    ) -> KeystoneResult<CachedValue> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_or_set_returns_input() {
        let cache = NoopCache::default();
        let key = CacheKey::from("k");
        let value = cache.get_or_set(&key, json!({"a": 1}), None).await.unwrap();
        assert_eq!(value, json!({"a": 1}));

        let err = cache.get(&key).await.unwrap_err();
        assert!(matches!(err, KeystoneError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_mutations_are_silent() {
        let cache = NoopCache::new("ns", Duration::from_secs(60));
        let key = CacheKey::from("k");
        cache.set(&key, json!(1), Some(Duration::from_secs(1))).await;
        assert!(cache.delete(&key).await.is_ok());
        assert!(cache.exists(&key).await.is_err());
        assert!(cache.set_driver().await.is_ok());
        assert_eq!(cache.kind(), CacheKind::Noop);
        assert_eq!(cache.namespace(), "ns");
    }

    #[test]
    fn test_connection_is_stored() {
        let cache = NoopCache::default();
        cache.set_connection(CacheConfig {
            host: Some("nowhere".to_string()),
            ..CacheConfig::default()
        });
        assert_eq!(cache.connection().host.as_deref(), Some("nowhere"));
    }
}
