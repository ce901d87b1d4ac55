//! Configuration validation module.
//!
//! Collects every problem in one pass so startup fails with the full list.

use crate::{AppConfig, CacheKind, StoreKind};
use std::fmt;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Neither a `dsn` nor the full discrete field set is present.
    MissingConnection { section: &'static str, fields: &'static str },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// A duration or size must be positive.
    NonPositiveValue { name: String },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// A duration exceeds the maximum allowed.
    ValueTooLarge { name: String, value: u64, maximum: u64 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { name: String, value: u64, maximum: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl ConfigValidationError {
    /// True for errors that mean a connection descriptor is absent.
    #[must_use]
    pub const fn is_missing_connection(&self) -> bool {
        matches!(self, Self::MissingConnection { .. })
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingConnection { section, fields } => {
                write!(f, "{}: either 'dsn' or all of {} must be set", section, fields)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::NonPositiveValue { name } => {
                write!(f, "'{}' must be positive", name)
            }
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::ValueTooLarge { name, value, maximum } | Self::PoolSizeTooLarge { name, value, maximum } => {
                write!(f, "'{}' = {} exceeds maximum allowed ({})", name, value, maximum)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u64 = 1000;
    /// Maximum cache TTL: one hundred years.
    const MAX_CACHE_TTL_MINUTES: u64 = 100 * 365 * 24 * 60;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_cache(config, &mut errors);
        Self::validate_persistence(config, &mut errors);
        Self::validate_events(config, &mut errors);
        Self::validate_observability(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_cache(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let cache = &config.cache;

        if !cache.is_complete() {
            errors.push(ConfigValidationError::MissingConnection {
                section: "cache",
                fields: "host, port, user, password, namespace",
            });
        }

        if cache.kind == CacheKind::Redis {
            if let Some(dsn) = cache.dsn.as_deref().filter(|d| !d.is_empty()) {
                if !dsn.starts_with("redis://") && !dsn.starts_with("rediss://") {
                    errors.push(ConfigValidationError::InvalidUrl {
                        url_type: "cache".to_string(),
                        message: "URL must start with redis:// or rediss://".to_string(),
                    });
                }
            }
        }

        if cache.default_ttl_minutes == 0 {
            errors.push(ConfigValidationError::NonPositiveValue {
                name: "cache.default_ttl_minutes".to_string(),
            });
        } else if cache.default_ttl_minutes > Self::MAX_CACHE_TTL_MINUTES {
            errors.push(ConfigValidationError::ValueTooLarge {
                name: "cache.default_ttl_minutes".to_string(),
                value: cache.default_ttl_minutes,
                maximum: Self::MAX_CACHE_TTL_MINUTES,
            });
        }

        if cache.pool_size == 0 {
            errors.push(ConfigValidationError::NonPositiveValue {
                name: "cache.pool_size".to_string(),
            });
        } else if cache.pool_size as u64 > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                name: "cache.pool_size".to_string(),
                value: cache.pool_size as u64,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_persistence(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let store = &config.persistence;

        if !store.is_complete() {
            errors.push(ConfigValidationError::MissingConnection {
                section: "persistence",
                fields: "host, port, user, password, database_name",
            });
        }

        if store.kind == StoreKind::Document {
            if let Some(dsn) = store.dsn.as_deref().filter(|d| !d.is_empty()) {
                if !dsn.starts_with("mysql://") {
                    errors.push(ConfigValidationError::InvalidUrl {
                        url_type: "persistence".to_string(),
                        message: "URL must start with mysql://".to_string(),
                    });
                }
            }
        }

        if store.min_connections > store.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: store.min_connections,
                max: store.max_connections,
            });
        }
        if u64::from(store.max_connections) > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                name: "persistence.max_connections".to_string(),
                value: u64::from(store.max_connections),
                maximum: Self::MAX_POOL_SIZE,
            });
        }
        if store.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveValue {
                name: "persistence.connect_timeout_secs".to_string(),
            });
        }
    }

    fn validate_events(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.events.publish_timeout_secs == Some(0) {
            errors.push(ConfigValidationError::NonPositiveValue {
                name: "events.publish_timeout_secs".to_string(),
            });
        }
    }

    fn validate_observability(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let level = config.observability.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.observability.log_level.clone(),
            });
        }
    }
}
