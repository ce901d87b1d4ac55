//! # Keystone Cache
//!
//! Namespace-aware caching for the data-access layer.
//!
//! - [`derive_key`] turns an ordered list of [`KeyPart`]s into a [`CacheKey`].
//! - [`CacheBackend`] is the uniform contract; [`NoopCache`], [`MemoryCache`]
//!   and [`RedisCache`] implement it.
//! - [`CacheManager`] picks one backend from configuration and exposes it
//!   to the rest of the application.

mod backend;
mod entry;
mod key;
mod manager;
pub mod metrics;
mod memory;
mod noop;
mod redis_cache;

pub use backend::{CacheBackend, CacheExt, CachedValue};
pub use entry::{CacheEntry, NamespaceTable};
pub use key::{derive_key, CacheKey, Describe, KeyPart};
pub use manager::{CacheManager, CacheManagerParameters};
pub use memory::MemoryCache;
pub use noop::NoopCache;
pub use redis_cache::RedisCache;
