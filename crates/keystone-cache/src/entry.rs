//! In-process cache storage.

use crate::{CacheKey, CachedValue};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A stored value and the instant it stops being usable.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Stored value.
    pub value: CachedValue,
    /// Expiry instant (UTC).
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry expiring `ttl` from now.
    #[must_use]
    pub fn new(value: CachedValue, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: expiry_from(Utc::now(), ttl),
        }
    }

    /// True once `now` reaches the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True if the entry is expired right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Computes `now + ttl`, saturating at the largest representable instant.
fn expiry_from(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Entries of a single namespace.
pub type NamespaceMap = RwLock<HashMap<CacheKey, CacheEntry>>;

/// `namespace -> (key -> entry)`.
///
/// Namespaces are created on first access and live as long as the table.
/// Each namespace has its own lock, so traffic in one namespace does not
/// contend with another.
#[derive(Debug, Default)]
pub struct NamespaceTable {
    namespaces: RwLock<HashMap<String, Arc<NamespaceMap>>>,
}

impl NamespaceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the map for `namespace`, creating it if needed.
    pub fn namespace(&self, namespace: &str) -> Arc<NamespaceMap> {
        if let Some(map) = self.namespaces.read().get(namespace) {
            return Arc::clone(map);
        }

        let mut namespaces = self.namespaces.write();
        Arc::clone(
            namespaces
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(HashMap::new()))),
        )
    }

    /// Returns the names of every namespace created so far.
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    /// Returns the number of entries, expired or not, in `namespace`.
    pub fn entry_count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, |map| map.read().len())
    }
}
