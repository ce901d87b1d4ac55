//! Backend kind discriminators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache backend selected at startup.
///
/// Parsing is lenient: any value that is not recognized as the no-op or
/// in-process variant selects the external store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum CacheKind {
    /// Caching disabled; every call is a silent no-op.
    Noop,
    /// Process-local TTL store.
    Memory,
    /// Networked TTL store (Redis).
    #[default]
    Redis,
}

impl CacheKind {
    /// Parses a discriminator, falling back to [`CacheKind::Redis`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "noop" | "no-op" | "none" | "disabled" => Self::Noop,
            "memory" | "in-memory" | "in-process" | "local" => Self::Memory,
            _ => Self::Redis,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::Memory => "memory",
            Self::Redis => "redis",
        }
    }

    /// Returns true if this kind talks to a remote server.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::Redis)
    }
}

impl From<String> for CacheKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CacheKind> for String {
    fn from(kind: CacheKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document store selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum StoreKind {
    /// MySQL-backed JSON document store.
    #[default]
    Document,
    /// Process-local document store.
    Memory,
}

impl StoreKind {
    /// Parses a discriminator, falling back to [`StoreKind::Document`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "memory" | "in-memory" | "in-process" => Self::Memory,
            _ => Self::Document,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Memory => "memory",
        }
    }
}

impl From<String> for StoreKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<StoreKind> for String {
    fn from(kind: StoreKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_kind_parse() {
        assert_eq!(CacheKind::parse("noop"), CacheKind::Noop);
        assert_eq!(CacheKind::parse("No-Op"), CacheKind::Noop);
        assert_eq!(CacheKind::parse("memory"), CacheKind::Memory);
        assert_eq!(CacheKind::parse("in-process"), CacheKind::Memory);
        assert_eq!(CacheKind::parse("redis"), CacheKind::Redis);
    }

    #[test]
    fn test_unknown_cache_kind_falls_back_to_external() {
        assert_eq!(CacheKind::parse("memcached"), CacheKind::Redis);
        assert_eq!(CacheKind::parse(""), CacheKind::Redis);
        assert!(CacheKind::parse("whatever").is_external());
    }

    #[test]
    fn test_store_kind_parse() {
        assert_eq!(StoreKind::parse("memory"), StoreKind::Memory);
        assert_eq!(StoreKind::parse("mongo"), StoreKind::Document);
        assert_eq!(StoreKind::parse("document"), StoreKind::Document);
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheKind::Memory.to_string(), "memory");
        assert_eq!(StoreKind::Document.to_string(), "document");
        assert_eq!(String::from(CacheKind::Noop), "noop");
    }
}
