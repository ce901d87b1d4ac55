//! Event bus metrics.

use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names for the event bus.
pub mod names {
    /// Total publish calls that reached at least one handler.
    pub const EVENTS_PUBLISHED_TOTAL: &str = "keystone_events_published_total";
    /// Total handler invocations, labelled by outcome.
    pub const HANDLER_OUTCOMES_TOTAL: &str = "keystone_event_handler_outcomes_total";
    /// Time from dispatch until every handler finished.
    pub const PUBLISH_DURATION_SECONDS: &str = "keystone_event_publish_duration_seconds";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::EVENTS_PUBLISHED_TOTAL, "Total number of events published");
    describe_counter!(
        names::HANDLER_OUTCOMES_TOTAL,
        "Total number of handler invocations by outcome"
    );
    describe_histogram!(
        names::PUBLISH_DURATION_SECONDS,
        "Publish duration in seconds, including every handler"
    );
}

/// Event bus metrics recorder.
#[derive(Clone)]
pub struct EventMetrics;

impl EventMetrics {
    /// Record a publish.
    pub fn published(topic: &str, handlers: usize, duration: Duration) {
        counter!(names::EVENTS_PUBLISHED_TOTAL, "topic" => topic.to_string()).increment(1);
        histogram!(
            names::PUBLISH_DURATION_SECONDS,
            "topic" => topic.to_string(),
            "handlers" => handlers.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record how one handler ended.
    pub fn handler_outcome(topic: &str, handler: &str, outcome: &'static str) {
        counter!(
            names::HANDLER_OUTCOMES_TOTAL,
            "topic" => topic.to_string(),
            "handler" => handler.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }
}
