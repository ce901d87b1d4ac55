//! Cache key derivation.
//!
//! A key is the literal byte concatenation of its parts, in order, with no
//! separator. `["ab", "c"]` and `["a", "bc"]` therefore derive the same key;
//! callers must pass parts in a stable order and shape.

use std::fmt;

/// Opaque cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Vec<u8>);

impl CacheKey {
    /// Wraps raw bytes as a key.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the key derived from no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `namespace:` followed by the key bytes.
    #[must_use]
    pub fn namespaced(&self, namespace: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(namespace.len() + 1 + self.0.len());
        out.extend_from_slice(namespace.as_bytes());
        out.push(b':');
        out.extend_from_slice(&self.0);
        out
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

/// Canonical string form of a structured value.
///
/// Two structurally identical values must describe to the same string.
pub trait Describe {
    /// Returns the canonical description.
    fn describe(&self) -> String;
}

impl Describe for serde_json::Value {
    fn describe(&self) -> String {
        // serde_json maps are ordered by key, so the output is canonical.
        self.to_string()
    }
}

/// One component of a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    /// Raw text, appended as-is.
    Text(String),
    /// Canonical description of a structured value.
    Described(String),
}

impl KeyPart {
    /// Creates a text part.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a part from a structured value's canonical form.
    #[must_use]
    pub fn described<D: Describe + ?Sized>(value: &D) -> Self {
        Self::Described(value.describe())
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) | Self::Described(text) => text.as_bytes(),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Derives a key by concatenating every part's bytes in order.
#[must_use]
pub fn derive_key(parts: &[KeyPart]) -> CacheKey {
    let capacity = parts.iter().map(|p| p.as_bytes().len()).sum();
    let mut bytes = Vec::with_capacity(capacity);
    for part in parts {
        bytes.extend_from_slice(part.as_bytes());
    }
    CacheKey(bytes)
}
