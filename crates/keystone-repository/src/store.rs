//! Read-through data access.

use crate::{Criteria, Document, DocumentDriver, MemoryDocumentDriver};
use async_trait::async_trait;
use keystone_cache::{derive_key, CacheBackend, CacheKey, CachedValue, Describe, KeyPart};
use keystone_core::{HealthCheck, HealthStatus, Interface, KeystoneError, KeystoneResult};
use serde_json::Value;
use shaku::Component;
use std::sync::Arc;
use tracing::{debug, warn};

/// Document access exposed to repositories.
///
/// Reads go through the cache; writes go straight to the store and do not
/// touch cached entries, so a read may return data that is stale by up to
/// the cache's default TTL.
#[async_trait]
pub trait DocumentStore: Interface + Send + Sync {
    /// Returns the first matching document. Fails with `NotFound` if none match.
    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Document>;

    /// Returns every matching document.
    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>>;

    async fn insert_one(&self, collection: &str, document: Document) -> KeystoneResult<Document>;

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>>;

    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;

    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64>;

    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64>;
}

fn default_driver() -> Arc<dyn DocumentDriver> {
    Arc::new(MemoryDocumentDriver::new())
}

/// Derives the cache key for a read: the collection followed by the
/// criteria's canonical description.
#[must_use]
pub fn read_key(collection: &str, criteria: &Criteria) -> CacheKey {
    derive_key(&[KeyPart::text(collection), KeyPart::described(criteria)])
}

/// [`DocumentStore`] that fronts a [`DocumentDriver`] with the application cache.
#[derive(Component)]
#[shaku(interface = DocumentStore)]
pub struct ReadThroughStore {
    #[shaku(inject)]
    cache: Arc<dyn CacheBackend>,
    #[shaku(default = default_driver())]
    driver: Arc<dyn DocumentDriver>,
}

impl ReadThroughStore {
    #[must_use]
    pub fn new(cache: Arc<dyn CacheBackend>, driver: Arc<dyn DocumentDriver>) -> Self {
        Self { cache, driver }
    }

    /// Returns the underlying driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn DocumentDriver> {
        &self.driver
    }

    /// Looks the key up. Misses and unreachable caches both mean "query the
    /// store"; a stored value that cannot be read back is an error.
    async fn cached(&self, key: &CacheKey) -> KeystoneResult<Option<CachedValue>> {
        match self.cache.get(key).await {
            Ok(value) => {
                debug!("Read-through hit for '{}'", key);
                Ok(Some(value))
            }
            Err(e) if e.is_cache_miss() => {
                debug!("Read-through miss for '{}': {}", key, e.error_code());
                Ok(None)
            }
            Err(e @ KeystoneError::TypeMismatch { .. }) => Err(e),
            Err(e) => {
                warn!("Cache lookup failed for '{}', querying store: {}", key, e);
                Ok(None)
            }
        }
    }
}

fn context(collection: &str, criteria: &Criteria) -> String {
    format!("{} {}", collection, criteria.describe())
}

fn expect_document(value: CachedValue) -> KeystoneResult<Document> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(KeystoneError::TypeMismatch {
            expected: "document object",
            found: json_kind(&other).to_string(),
        }),
    }
}

fn expect_documents(value: CachedValue) -> KeystoneResult<Vec<Document>> {
    let Value::Array(items) = value else {
        return Err(KeystoneError::TypeMismatch {
            expected: "array of document objects",
            found: json_kind(&value).to_string(),
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(document) => Ok(document),
            other => Err(KeystoneError::TypeMismatch {
                expected: "array of document objects",
                found: format!("array containing {}", json_kind(&other)),
            }),
        })
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl DocumentStore for ReadThroughStore {
    async fn find_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Document> {
        let key = read_key(collection, criteria);

        let hit = self
            .cached(&key)
            .await
            .and_then(|hit| hit.map(expect_document).transpose())
            .map_err(|e| e.with_context("find_one", context(collection, criteria)))?;
        if let Some(document) = hit {
            return Ok(document);
        }

        let document = self
            .driver
            .find_one(collection, criteria)
            .await
            .map_err(|e| e.with_context("find_one", context(collection, criteria)))?
            .ok_or_else(|| KeystoneError::not_found(collection, criteria.describe()))?;

        self.cache
            .set(&key, Value::Object(document.clone()), None)
            .await;
        Ok(document)
    }

    async fn find_all(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<Vec<Document>> {
        let key = read_key(collection, criteria);

        let hit = self
            .cached(&key)
            .await
            .and_then(|hit| hit.map(expect_documents).transpose())
            .map_err(|e| e.with_context("find_all", context(collection, criteria)))?;
        if let Some(documents) = hit {
            return Ok(documents);
        }

        let documents = self
            .driver
            .find_all(collection, criteria)
            .await
            .map_err(|e| e.with_context("find_all", context(collection, criteria)))?;

        let cached = documents.iter().cloned().map(Value::Object).collect();
        self.cache.set(&key, Value::Array(cached), None).await;
        Ok(documents)
    }

    async fn insert_one(&self, collection: &str, document: Document) -> KeystoneResult<Document> {
        self.driver
            .insert_one(collection, document)
            .await
            .map_err(|e| e.with_context("insert_one", collection))
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> KeystoneResult<Vec<Document>> {
        let count = documents.len();
        self.driver
            .insert_many(collection, documents)
            .await
            .map_err(|e| e.with_context("insert_many", format!("{} ({} documents)", collection, count)))
    }

    async fn update_one(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.driver
            .update_one(collection, criteria, patch)
            .await
            .map_err(|e| e.with_context("update_one", context(collection, criteria)))
    }

    async fn update_many(&self, collection: &str, criteria: &Criteria, patch: Document) -> KeystoneResult<u64> {
        self.driver
            .update_many(collection, criteria, patch)
            .await
            .map_err(|e| e.with_context("update_many", context(collection, criteria)))
    }

    async fn delete_one(&self, collection: &str, criteria: &Criteria) -> KeystoneResult<u64> {
        self.driver
            .delete_one(collection, criteria)
            .await
            .map_err(|e| e.with_context("delete_one", context(collection, criteria)))
    }
}

#[async_trait]
impl HealthCheck for ReadThroughStore {
    fn name(&self) -> &str {
        "document_store"
    }

    async fn check(&self) -> HealthStatus {
        match self.driver.ping().await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        }
    }
}
