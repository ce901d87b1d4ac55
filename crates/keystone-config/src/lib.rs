//! # Keystone Config
//!
//! Configuration management for Keystone.
//! Supports layered configuration from files and environment variables,
//! validated once at startup.

mod app_config;
mod kinds;
mod loader;
mod validation;

pub use app_config::*;
pub use kinds::*;
pub use loader::*;
pub use validation::*;
