//! Cache backend contract.

use crate::CacheKey;
use async_trait::async_trait;
use keystone_config::{CacheConfig, CacheKind};
use keystone_core::{Interface, KeystoneError, KeystoneResult};
use std::time::Duration;

/// Values are stored type-erased as JSON.
pub type CachedValue = serde_json::Value;

/// Uniform contract implemented by every cache variant.
///
/// All operations are scoped to the backend's namespace. Keys are unique
/// only within a namespace.
#[async_trait]
pub trait CacheBackend: Interface + Send + Sync {
    /// Initializes backend-specific state.
    ///
    /// Safe to call more than once; later calls are no-ops.
    async fn set_driver(&self) -> KeystoneResult<()>;

    /// Stores the connection descriptor. Not validated here.
    fn set_connection(&self, descriptor: CacheConfig);

    /// Returns the stored connection descriptor.
    fn connection(&self) -> CacheConfig;

    /// Returns the variant discriminator.
    fn kind(&self) -> CacheKind;

    /// Returns the active namespace.
    fn namespace(&self) -> &str;

    /// Returns the TTL used when `set` is called without one.
    fn default_ttl(&self) -> Duration;

    /// Stores `value` under `key`, expiring `ttl` (or the default TTL) from now.
    ///
    /// Never reports failure. The external store logs write errors and moves
    /// on, so a `set` is not a durability guarantee.
    async fn set(&self, key: &CacheKey, value: CachedValue, ttl: Option<Duration>);

    /// Returns the stored value.
    ///
    /// Fails with `NotFound` when the key is absent and with `Expired` when it
    /// is present but stale. Stale entries are not removed.
    async fn get(&self, key: &CacheKey) -> KeystoneResult<CachedValue>;

    /// Removes the entry. Fails with `NotFound` when the key is absent;
    /// expired entries can still be deleted.
    async fn delete(&self, key: &CacheKey) -> KeystoneResult<()>;

    /// Succeeds when the key is present, regardless of expiry.
    async fn exists(&self, key: &CacheKey) -> KeystoneResult<()>;

    /// Stores then reads back `value`.
    async fn get_or_set(
        &self,
        key: &CacheKey,
        value: CachedValue,
        ttl: Option<Duration>,
    ) -> KeystoneResult<CachedValue> {
        self.set(key, value, ttl).await;
        self.get(key).await
    }

    /// Checks that the backend is reachable.
    async fn ping(&self) -> KeystoneResult<()> {
        Ok(())
    }
}

/// Extension trait with typed methods for convenience.
#[async_trait]
pub trait CacheExt: CacheBackend {
    /// Gets a value and decodes it into `T`.
    ///
    /// A stored value that does not decode is a `TypeMismatch`.
    async fn get_as<T: serde::de::DeserializeOwned + Send>(&self, key: &CacheKey) -> KeystoneResult<T> {
        let value = self.get(key).await?;
        serde_json::from_value(value).map_err(|e| KeystoneError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: e.to_string(),
        })
    }

    /// Encodes `value` and stores it.
    async fn set_as<T: serde::Serialize + Send + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> KeystoneResult<()> {
        let json = serde_json::to_value(value)?;
        self.set(key, json, ttl).await;
        Ok(())
    }
}

// Blanket implementation for all CacheBackend implementations
impl<T: CacheBackend + ?Sized> CacheExt for T {}
