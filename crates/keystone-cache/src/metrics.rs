//! Cache metrics.
//!
//! Counters are emitted through the `metrics` facade; nothing is recorded
//! until the host process installs a recorder.

use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the cache layer.
pub mod names {
    /// Total cache hits.
    pub const CACHE_HITS_TOTAL: &str = "keystone_cache_hits_total";
    /// Total cache misses, labelled by reason.
    pub const CACHE_MISSES_TOTAL: &str = "keystone_cache_misses_total";
    /// Total cache writes.
    pub const CACHE_SETS_TOTAL: &str = "keystone_cache_sets_total";
    /// Total cache deletes.
    pub const CACHE_DELETES_TOTAL: &str = "keystone_cache_deletes_total";
    /// Total failed cache writes on the external store.
    pub const CACHE_WRITE_FAILURES_TOTAL: &str = "keystone_cache_write_failures_total";
    /// External store operation duration in seconds.
    pub const CACHE_OPERATION_DURATION: &str = "keystone_cache_operation_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::CACHE_HITS_TOTAL, "Total number of cache hits");
    describe_counter!(
        names::CACHE_MISSES_TOTAL,
        "Total number of cache misses (not_found or expired)"
    );
    describe_counter!(names::CACHE_SETS_TOTAL, "Total number of cache writes");
    describe_counter!(names::CACHE_DELETES_TOTAL, "Total number of cache deletes");
    describe_counter!(
        names::CACHE_WRITE_FAILURES_TOTAL,
        "Total number of cache writes dropped by the external store"
    );
    describe_histogram!(
        names::CACHE_OPERATION_DURATION,
        "External cache operation duration in seconds"
    );
}

/// Cache metrics recorder.
#[derive(Clone)]
pub struct CacheMetrics;

impl CacheMetrics {
    /// Record a hit.
    pub fn hit(kind: &str, namespace: &str) {
        counter!(
            names::CACHE_HITS_TOTAL,
            "kind" => kind.to_string(),
            "namespace" => namespace.to_string()
        )
        .increment(1);
    }

    /// Record a miss. `reason` is `not_found` or `expired`.
    pub fn miss(kind: &str, namespace: &str, reason: &'static str) {
        counter!(
            names::CACHE_MISSES_TOTAL,
            "kind" => kind.to_string(),
            "namespace" => namespace.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    /// Record a write.
    pub fn set(kind: &str) {
        counter!(names::CACHE_SETS_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    /// Record a delete.
    pub fn delete(kind: &str) {
        counter!(names::CACHE_DELETES_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    /// Record a dropped write.
    pub fn write_failed(kind: &str) {
        counter!(names::CACHE_WRITE_FAILURES_TOTAL, "kind" => kind.to_string()).increment(1);
    }

    /// Record the duration of an external store round-trip.
    pub fn operation(operation: &'static str, duration: Duration) {
        histogram!(names::CACHE_OPERATION_DURATION, "operation" => operation)
            .record(duration.as_secs_f64());
    }
}
