//! Unified error types for all layers of the application.

use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Keystone.
///
/// Cache misses (`NotFound`, `Expired`) are recovered locally by the
/// read-through layer; everything else is propagated to the caller.
#[derive(Error, Debug)]
pub enum KeystoneError {
    // ============ Lookup Errors ============
    /// Key or record absent
    #[error("Not found: {resource} '{key}'")]
    NotFound { resource: String, key: String },

    /// Cache entry present but its TTL has elapsed
    #[error("Cache entry expired: '{key}'")]
    Expired { key: String },

    /// Cached value does not have the expected shape
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    /// Query criteria cannot be executed (bad field name, malformed filter)
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    // ============ Infrastructure Errors ============
    /// Store or cache backend unreachable
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// Database query error
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Cache backend error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ Configuration Errors ============
    /// Required connection settings are missing (fatal at startup)
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Event Bus Errors ============
    /// Removal of a handler that was never registered
    #[error("Handler '{handler}' is not registered for topic '{topic}'")]
    HandlerNotRegistered { topic: String, handler: String },

    /// Publish to a topic without subscribers
    #[error("Topic '{0}' has no registered handlers")]
    TopicHasNoHandlers(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeystoneError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Expired { .. } => "EXPIRED",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::InvalidCriteria(_) => "INVALID_CRITERIA",
            Self::Connectivity(_) => "CONNECTIVITY_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Decode(_) => "DECODE_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::HandlerNotRegistered { .. } => "HANDLER_NOT_REGISTERED",
            Self::TopicHasNoHandlers(_) => "TOPIC_HAS_NO_HANDLERS",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            key: key.to_string(),
        }
    }

    /// Creates an expired error.
    #[must_use]
    pub fn expired(key: impl ToString) -> Self {
        Self::Expired { key: key.to_string() }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// True for the two kinds that mean "no usable cached value".
    #[must_use]
    pub const fn is_cache_miss(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Database(_) | Self::Cache(_))
    }

    /// Prefixes the message with the failing operation and its arguments.
    ///
    /// Lookup and event-bus variants carry structured fields and are
    /// returned unchanged so callers can still match on them.
    #[must_use]
    pub fn with_context(self, operation: &str, detail: impl std::fmt::Display) -> Self {
        let prefix = format!("{operation} [{detail}]");
        match self {
            Self::Connectivity(msg) => Self::Connectivity(format!("{prefix}: {msg}")),
            Self::Database(msg) => Self::Database(format!("{prefix}: {msg}")),
            Self::Decode(msg) => Self::Decode(format!("{prefix}: {msg}")),
            Self::Cache(msg) => Self::Cache(format!("{prefix}: {msg}")),
            Self::Serialization(msg) => Self::Serialization(format!("{prefix}: {msg}")),
            Self::Internal(msg) => Self::Internal(format!("{prefix}: {msg}")),
            Self::TypeMismatch { expected, found } => Self::TypeMismatch {
                expected,
                found: format!("{found} ({prefix})"),
            },
            Self::Other(err) => Self::Other(err.context(prefix)),
            other => other,
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for KeystoneError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource: "database_row".to_string(),
                key: "unknown".to_string(),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connectivity(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => Self::Decode(err.to_string()),
            _ => Self::Database(err.to_string()),
        }
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::PoolError> for KeystoneError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Connectivity(format!("Failed to get Redis connection: {}", err))
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::redis::RedisError> for KeystoneError {
    fn from(err: deadpool_redis::redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connectivity(err.to_string())
        } else {
            Self::Cache(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KeystoneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON serialization error: {}", err))
    }
}
