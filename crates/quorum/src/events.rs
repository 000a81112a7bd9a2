//! Events emitted by the coordinator for observability.

use quorum_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Events emitted over the lifetime of one [`crate::FaultTolerantClient::query`] call.
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// A new attempt round started (the initial fanout, or a retry).
    AttemptStarted {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Number of server functions in this round.
        functions: usize,
        /// When this event occurred.
        timestamp: Instant,
    },

    /// A round came back with no successes at all, and the retry budget
    /// allows another attempt: a fresh round starts with only the failed
    /// functions.
    RetryNoneAvailable {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Retry attempt number about to start (1-indexed).
        attempt: u16,
        /// When this event occurred.
        timestamp: Instant,
    },

    /// A `Count` round produced successes but no value reached `n`
    /// agreements; a fresh round starts with the original function list.
    RetryInconsistent {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Retry attempt number about to start (1-indexed).
        attempt: u16,
        /// When this event occurred.
        timestamp: Instant,
    },

    /// An `Average` round produced successes but fewer than `m`; a fresh
    /// round starts with only the failed functions, keeping prior results.
    RetryNotEnough {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Retry attempt number about to start (1-indexed).
        attempt: u16,
        /// When this event occurred.
        timestamp: Instant,
    },

    /// `query` returned a value.
    QuerySucceeded {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Total wall-clock duration of the call.
        duration: Duration,
        /// When this event occurred.
        timestamp: Instant,
    },

    /// `query` raised an error.
    QueryFailed {
        /// Name of the client instance, if configured.
        name: Option<String>,
        /// Total wall-clock duration of the call.
        duration: Duration,
        /// When this event occurred.
        timestamp: Instant,
    },
}

impl ResilienceEvent for CoordinatorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CoordinatorEvent::AttemptStarted { .. } => "attempt_started",
            CoordinatorEvent::RetryNoneAvailable { .. } => "retry_none_available",
            CoordinatorEvent::RetryInconsistent { .. } => "retry_inconsistent",
            CoordinatorEvent::RetryNotEnough { .. } => "retry_not_enough",
            CoordinatorEvent::QuerySucceeded { .. } => "query_succeeded",
            CoordinatorEvent::QueryFailed { .. } => "query_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CoordinatorEvent::AttemptStarted { timestamp, .. }
            | CoordinatorEvent::RetryNoneAvailable { timestamp, .. }
            | CoordinatorEvent::RetryInconsistent { timestamp, .. }
            | CoordinatorEvent::RetryNotEnough { timestamp, .. }
            | CoordinatorEvent::QuerySucceeded { timestamp, .. }
            | CoordinatorEvent::QueryFailed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        let name = match self {
            CoordinatorEvent::AttemptStarted { name, .. }
            | CoordinatorEvent::RetryNoneAvailable { name, .. }
            | CoordinatorEvent::RetryInconsistent { name, .. }
            | CoordinatorEvent::RetryNotEnough { name, .. }
            | CoordinatorEvent::QuerySucceeded { name, .. }
            | CoordinatorEvent::QueryFailed { name, .. } => name,
        };
        name.as_deref().unwrap_or("quorum")
    }
}
