//! Behaviour shared by every cache backend, exercised through the trait object.

use keystone_cache::{derive_key, CacheBackend, CacheExt, CacheKey, CacheManager, KeyPart, MemoryCache, NoopCache};
use keystone_config::{CacheConfig, CacheKind};
use keystone_core::KeystoneError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn memory_config(namespace: &str) -> CacheConfig {
    CacheConfig {
        kind: CacheKind::Memory,
        dsn: Some("redis://localhost:6379".to_string()),
        namespace: Some(namespace.to_string()),
        ..CacheConfig::default()
    }
}

#[tokio::test]
async fn test_ttl_expiry_keeps_entry_present() {
    let cache = MemoryCache::new("units", Duration::from_secs(60));
    let key = CacheKey::from("U1");

    cache.set(&key, json!({"id": "U1"}), Some(Duration::from_millis(50))).await;
    assert_eq!(cache.get(&key).await.unwrap(), json!({"id": "U1"}));

    tokio::time::sleep(Duration::from_millis(80)).await;

    let err = cache.get(&key).await.unwrap_err();
    assert!(matches!(err, KeystoneError::Expired { .. }));
    assert!(cache.exists(&key).await.is_ok());
}

#[tokio::test]
async fn test_get_or_set_refreshes_expired_entry() {
    let cache = MemoryCache::new("units", Duration::from_secs(60));
    let key = CacheKey::from("U1");

    cache.set(&key, json!("old"), Some(Duration::ZERO)).await;
    let value = cache.get_or_set(&key, json!("new"), None).await.unwrap();
    assert_eq!(value, json!("new"));
}

#[tokio::test]
async fn test_namespace_isolation() {
    let a = MemoryCache::new("a", Duration::from_secs(60));
    let b = a.scoped("b");
    let key = CacheKey::from("k");

    a.set(&key, json!("v1"), None).await;
    b.set(&key, json!("v2"), None).await;

    assert_eq!(a.get(&key).await.unwrap(), json!("v1"));
    assert_eq!(b.get(&key).await.unwrap(), json!("v2"));

    a.delete(&key).await.unwrap();
    assert!(a.get(&key).await.is_err());
    assert_eq!(b.get(&key).await.unwrap(), json!("v2"));
}

#[tokio::test]
async fn test_noop_transparency() {
    let cache: Arc<dyn CacheBackend> = Arc::new(NoopCache::default());

    for value in [json!(null), json!(1), json!("text"), json!({"id": "U1"}), json!([1, 2])] {
        let key = derive_key(&[KeyPart::text("units"), KeyPart::described(&value)]);
        let returned = cache.get_or_set(&key, value.clone(), None).await.unwrap();
        assert_eq!(returned, value);

        let err = cache.get(&key).await.unwrap_err();
        assert!(matches!(err, KeystoneError::NotFound { .. }));
    }
}

#[tokio::test]
async fn test_delete_requires_existence() {
    let cache = CacheManager::from_config(&memory_config("units")).await.unwrap();
    let key = CacheKey::from("missing");

    let err = cache.delete(&key).await.unwrap_err();
    assert!(matches!(err, KeystoneError::NotFound { .. }));
    assert!(cache.exists(&key).await.is_err());
}

#[tokio::test]
async fn test_typed_round_trip() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Unit {
        id: String,
        floor: u32,
    }

    let cache = MemoryCache::new("units", Duration::from_secs(60));
    let key = CacheKey::from("U1");
    let unit = Unit { id: "U1".to_string(), floor: 3 };

    cache.set_as(&key, &unit, None).await.unwrap();
    let loaded: Unit = cache.get_as(&key).await.unwrap();
    assert_eq!(loaded, unit);

    let err = cache.get_as::<Vec<String>>(&key).await.unwrap_err();
    assert!(matches!(err, KeystoneError::TypeMismatch { .. }));
}

#[tokio::test]
async fn test_concurrent_writers_in_one_namespace() {
    let cache = Arc::new(MemoryCache::new("units", Duration::from_secs(60)));

    let mut handles = Vec::new();
    for i in 0..32 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = CacheKey::from(format!("k{}", i));
            cache.set(&key, json!(i), None).await;
            cache.get(&key).await.unwrap()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), json!(i));
    }
    assert_eq!(cache.entry_count(), 32);
}
