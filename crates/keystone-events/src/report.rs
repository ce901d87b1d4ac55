//! Per-handler publish results.

use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// How one handler invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerStatus {
    Completed,
    /// The handler returned an error.
    Failed(String),
    /// The handler panicked.
    Panicked(String),
    /// The handler was still running at the publish deadline and was aborted.
    TimedOut,
}

impl HandlerStatus {
    /// Metric label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
            Self::TimedOut => "timed_out",
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(message) | Self::Panicked(message) => {
                write!(f, "{}: {}", self.as_str(), message)
            }
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Result of one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub handler: String,
    pub status: HandlerStatus,
}

/// Result of a publish call, one outcome per dispatched handler.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub topic: String,
    pub event_id: Uuid,
    pub outcomes: Vec<HandlerOutcome>,
    pub elapsed: Duration,
}

impl PublishReport {
    /// True if every handler completed.
    #[must_use]
    pub fn all_completed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_completed())
    }

    /// Outcomes that did not complete.
    pub fn failures(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_completed())
    }

    /// Status of the named handler.
    #[must_use]
    pub fn status_of(&self, handler: &str) -> Option<&HandlerStatus> {
        self.outcomes
            .iter()
            .find(|o| o.handler == handler)
            .map(|o| &o.status)
    }
}
