//! Result type aliases for Keystone.

use crate::KeystoneError;

/// A specialized `Result` type for Keystone operations.
pub type KeystoneResult<T> = Result<T, KeystoneError>;

/// A boxed future returning a `KeystoneResult`.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = KeystoneResult<T>> + Send + 'a>>;
