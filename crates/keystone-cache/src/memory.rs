//! In-process TTL cache.

use crate::metrics::CacheMetrics;
use crate::{CacheBackend, CacheEntry, CacheKey, CachedValue, NamespaceTable};
use async_trait::async_trait;
use chrono::Utc;
use keystone_config::{CacheConfig, CacheKind};
use keystone_core::{KeystoneError, KeystoneResult};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cache held in process memory.
///
/// State is lost on restart and is not shared between processes. Expiry is
/// lazy: a stale entry stays in the table until it is overwritten, deleted
/// or swept by [`MemoryCache::purge_expired`], but every read treats it as
/// absent.
#[derive(Debug)]
pub struct MemoryCache {
    namespace: String,
    default_ttl: Duration,
    connection: RwLock<CacheConfig>,
    table: Arc<NamespaceTable>,
}

impl MemoryCache {
    /// Creates a cache with its own namespace table.
    #[must_use]
    pub fn new(namespace: impl Into<String>, default_ttl: Duration) -> Self {
        Self::with_table(Arc::new(NamespaceTable::new()), namespace, default_ttl)
    }

    /// Creates a cache over an existing table.
    #[must_use]
    pub fn with_table(
        table: Arc<NamespaceTable>,
        namespace: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            connection: RwLock::new(CacheConfig {
                kind: CacheKind::Memory,
                ..CacheConfig::default()
            }),
            table,
        }
    }

    /// Returns a cache over the same table, scoped to another namespace.
    #[must_use]
    pub fn scoped(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl: self.default_ttl,
            connection: RwLock::new(self.connection()),
            table: Arc::clone(&self.table),
        }
    }

    /// Returns the shared namespace table.
    #[must_use]
    pub fn table(&self) -> &Arc<NamespaceTable> {
        &self.table
    }

    /// Number of entries physically present in this namespace, stale ones included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.table.entry_count(&self.namespace)
    }

    /// Removes every expired entry in this namespace. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let map = self.table.namespace(&self.namespace);
        let mut entries = map.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!("Purged {} expired entries from namespace '{}'", removed, self.namespace);
        }
        removed
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set_driver(&self) -> KeystoneResult<()> {
        self.table.namespace(&self.namespace);
        Ok(())
    }

    fn set_connection(&self, descriptor: CacheConfig) {
        *self.connection.write() = descriptor;
    }

    fn connection(&self) -> CacheConfig {
        self.connection.read().clone()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Memory
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn set(&self, key: &CacheKey, value: CachedValue, ttl: Option<Duration>) {
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        self.table
            .namespace(&self.namespace)
            .write()
            .insert(key.clone(), entry);
        CacheMetrics::set(CacheKind::Memory.as_str());
    }

    async fn get(&self, key: &CacheKey) -> KeystoneResult<CachedValue> {
        let map = self.table.namespace(&self.namespace);
        let entries = map.read();
        let kind = CacheKind::Memory.as_str();

        match entries.get(key) {
            None => {
                CacheMetrics::miss(kind, &self.namespace, "not_found");
                Err(KeystoneError::not_found("cache", key))
            }
            Some(entry) if entry.is_expired() => {
                CacheMetrics::miss(kind, &self.namespace, "expired");
                Err(KeystoneError::expired(key))
            }
            Some(entry) => {
                CacheMetrics::hit(kind, &self.namespace);
                Ok(entry.value.clone())
            }
        }
    }

    async fn delete(&self, key: &CacheKey) -> KeystoneResult<()> {
        let removed = self.table.namespace(&self.namespace).write().remove(key);
        match removed {
            Some(_) => {
                CacheMetrics::delete(CacheKind::Memory.as_str());
                Ok(())
            }
            None => Err(KeystoneError::not_found("cache", key)),
        }
    }

    async fn exists(&self, key: &CacheKey) -> KeystoneResult<()> {
        if self.table.namespace(&self.namespace).read().contains_key(key) {
            Ok(())
        } else {
            Err(KeystoneError::not_found("cache", key))
        }
    }
}
