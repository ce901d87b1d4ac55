//! Read-through behaviour of the document store.

use async_trait::async_trait;
use keystone_cache::{CacheBackend, CacheKey, CachedValue, MemoryCache, NoopCache};
use keystone_config::{CacheConfig, CacheKind, StoreKind};
use keystone_core::{KeystoneError, KeystoneResult};
use keystone_repository::{
    read_key, Criteria, Document, DocumentDriver, DocumentStore, MemoryDocumentDriver, ReadThroughStore,
};
use mockall::mock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

/// Memory driver that counts read round-trips.
#[derive(Default)]
struct CountingDriver {
    inner: MemoryDocumentDriver,
    reads: AtomicUsize,
}

impl CountingDriver {
    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentDriver for CountingDriver {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Option<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, criteria).await
    }

    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all(collection, criteria).await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> KeystoneResult<Document> {
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>> {
        self.inner.insert_many(collection, documents).await
    }

    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.inner.update_one(collection, criteria, patch).await
    }

    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.inner.update_many(collection, criteria, patch).await
    }

    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64> {
        self.inner.delete_one(collection, criteria).await
    }

    async fn ping(&self) -> KeystoneResult<()> {
        Ok(())
    }
}

/// Cache whose stored payloads can no longer be decoded.
struct UndecodableCache;

#[async_trait]
impl CacheBackend for UndecodableCache {
    async fn set_driver(&self) -> KeystoneResult<()> {
        Ok(())
    }

    fn set_connection(&self, _descriptor: CacheConfig) {}

    fn connection(&self) -> CacheConfig {
        CacheConfig::default()
    }

    fn kind(&self) -> CacheKind {
        CacheKind::Redis
    }

    fn namespace(&self) -> &str {
        "units"
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn set(&self, _key: &CacheKey, _value: CachedValue, _ttl: Option<Duration>) {}

    async fn get(&self, _key: &CacheKey) -> KeystoneResult<CachedValue> {
        Err(KeystoneError::TypeMismatch {
            expected: "JSON value",
            found: "expected value at line 1 column 1".to_string(),
        })
    }

    async fn delete(&self, _key: &CacheKey) -> KeystoneResult<()> {
        Ok(())
    }

    async fn exists(&self, _key: &CacheKey) -> KeystoneResult<()> {
        Ok(())
    }
}

mock! {
    pub Driver {}

    #[async_trait]
    impl DocumentDriver for Driver {
        fn kind(&self) -> StoreKind;
        async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Option<Document>>;
        async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>>;
        async fn insert_one(&self, collection: &str, document: Document) -> KeystoneResult<Document>;
        async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>>;
        async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;
        async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;
        async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64>;
        async fn ping(&self) -> KeystoneResult<()>;
    }
}

fn memory_cache() -> Arc<MemoryCache> {
    Arc::new(MemoryCache::new("units", Duration::from_secs(60)))
}

async fn seeded_driver() -> Arc<CountingDriver> {
    let driver = Arc::new(CountingDriver::default());
    driver
        .insert_many(
            "units",
            vec![
                doc(json!({"id": "U1", "floor": 1})),
                doc(json!({"id": "U2", "floor": 2})),
            ],
        )
        .await
        .unwrap();
    driver
}

#[tokio::test]
async fn test_find_one_populates_cache() {
    let cache = memory_cache();
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(cache.clone(), driver.clone());
    let criteria = Criteria::by_id("U1");

    let first = store.find_one("units", &criteria).await.unwrap();
    let second = store.find_one("units", &criteria).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.get("floor"), Some(&json!(1)));
    assert_eq!(driver.reads(), 1);
    assert!(cache.exists(&read_key("units", &criteria)).await.is_ok());
}

#[tokio::test]
async fn test_find_all_populates_cache() {
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(memory_cache(), driver.clone());

    assert_eq!(store.find_all("units", &Criteria::new()).await.unwrap().len(), 2);
    assert_eq!(store.find_all("units", &Criteria::new()).await.unwrap().len(), 2);
    assert_eq!(driver.reads(), 1);
}

#[tokio::test]
async fn test_different_criteria_miss() {
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(memory_cache(), driver.clone());

    store.find_one("units", &Criteria::by_id("U1")).await.unwrap();
    store.find_one("units", &Criteria::by_id("U2")).await.unwrap();
    assert_eq!(driver.reads(), 2);
}

#[tokio::test]
async fn test_expired_entry_queries_store() {
    let cache = memory_cache();
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(cache.clone(), driver.clone());
    let criteria = Criteria::by_id("U1");

    cache
        .set(&read_key("units", &criteria), json!({"id": "stale"}), Some(Duration::ZERO))
        .await;

    let found = store.find_one("units", &criteria).await.unwrap();
    assert_eq!(found.get("id"), Some(&json!("U1")));
    assert_eq!(driver.reads(), 1);
}

#[tokio::test]
async fn test_noop_cache_always_queries_store() {
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(Arc::new(NoopCache::default()), driver.clone());

    store.find_one("units", &Criteria::by_id("U1")).await.unwrap();
    store.find_one("units", &Criteria::by_id("U1")).await.unwrap();
    assert_eq!(driver.reads(), 2);
}

#[tokio::test]
async fn test_writes_bypass_cache() {
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(memory_cache(), driver.clone());
    let criteria = Criteria::by_id("U1");

    store.find_one("units", &criteria).await.unwrap();
    let updated = store
        .update_one("units", &criteria, doc(json!({"floor": 7})))
        .await
        .unwrap();
    assert_eq!(updated, 1);

    // cached copy is served until its TTL elapses
    let cached = store.find_one("units", &criteria).await.unwrap();
    assert_eq!(cached.get("floor"), Some(&json!(1)));
    assert_eq!(driver.reads(), 1);
}

#[tokio::test]
async fn test_missing_record_is_not_found_and_not_cached() {
    let cache = memory_cache();
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(cache.clone(), driver.clone());
    let criteria = Criteria::by_id("U9");

    let err = store.find_one("units", &criteria).await.unwrap_err();
    assert!(matches!(err, KeystoneError::NotFound { .. }));
    assert!(cache.exists(&read_key("units", &criteria)).await.is_err());
}

#[tokio::test]
async fn test_wrong_shape_in_cache_is_type_mismatch() {
    let cache = memory_cache();
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(cache.clone(), driver.clone());
    let criteria = Criteria::by_id("U1");

    cache
        .set(&read_key("units", &criteria), json!("corrupt"), None)
        .await;

    let err = store.find_one("units", &criteria).await.unwrap_err();
    assert!(matches!(err, KeystoneError::TypeMismatch { .. }));
    assert!(err.to_string().contains("find_one"));
    assert_eq!(driver.reads(), 0);
}

#[tokio::test]
async fn test_undecodable_cache_entry_is_reported() {
    let driver = seeded_driver().await;
    let store = ReadThroughStore::new(Arc::new(UndecodableCache), driver.clone());

    let err = store.find_one("units", &Criteria::by_id("U1")).await.unwrap_err();
    assert!(matches!(err, KeystoneError::TypeMismatch { .. }));
    assert!(err.to_string().contains("find_one"));
    assert!(err.to_string().contains("U1"));

    let err = store.find_all("units", &Criteria::new()).await.unwrap_err();
    assert!(matches!(err, KeystoneError::TypeMismatch { .. }));
    assert!(err.to_string().contains("find_all"));

    assert_eq!(driver.reads(), 0);
}

#[tokio::test]
async fn test_unreachable_cache_falls_back_to_store() {
    let driver = seeded_driver().await;
    let cache = Arc::new(keystone_cache::RedisCache::new("units", Duration::from_secs(60)));
    let store = ReadThroughStore::new(cache, driver.clone());

    let found = store.find_one("units", &Criteria::by_id("U1")).await.unwrap();
    assert_eq!(found.get("id"), Some(&json!("U1")));
    assert_eq!(driver.reads(), 1);
}

#[tokio::test]
async fn test_store_failure_is_wrapped_with_context() {
    let mut driver = MockDriver::new();
    driver
        .expect_find_one()
        .times(1)
        .returning(|_, _| Err(KeystoneError::Connectivity("connection refused".to_string())));

    let cache = memory_cache();
    let store = ReadThroughStore::new(cache.clone(), Arc::new(driver));
    let criteria = Criteria::by_id("U1");

    let err = store.find_one("units", &criteria).await.unwrap_err();
    assert!(matches!(err, KeystoneError::Connectivity(_)));
    let message = err.to_string();
    assert!(message.contains("find_one"));
    assert!(message.contains("units"));
    assert!(message.contains("U1"));
    assert!(message.contains("connection refused"));
    assert!(cache.exists(&read_key("units", &criteria)).await.is_err());
}

#[tokio::test]
async fn test_decode_failure_propagates() {
    let mut driver = MockDriver::new();
    driver
        .expect_find_all()
        .times(1)
        .returning(|_, _| Err(KeystoneError::Decode("bad row".to_string())));

    let store = ReadThroughStore::new(memory_cache(), Arc::new(driver));
    let err = store.find_all("units", &Criteria::new()).await.unwrap_err();
    assert!(matches!(err, KeystoneError::Decode(_)));
    assert!(err.to_string().contains("find_all"));
}

#[tokio::test]
async fn test_empty_result_is_cached() {
    let mut driver = MockDriver::new();
    driver.expect_find_all().times(1).returning(|_, _| Ok(Vec::new()));

    let store = ReadThroughStore::new(memory_cache(), Arc::new(driver));
    assert!(store.find_all("units", &Criteria::new()).await.unwrap().is_empty());
    assert!(store.find_all("units", &Criteria::new()).await.unwrap().is_empty());
}
