//! Consistency policies and coordinator settings.

use crate::events::CoordinatorEvent;
use quorum_core::events::{EventListeners, FnListener};
use std::time::Duration;

/// Combines the values collected from a completed `Average` round into one.
///
/// Implement this to pick a reducer other than the built-in [`mean`](Aggregator::mean)
/// (e.g. median, min, a weighted blend).
pub trait Aggregator<R>: Send + Sync {
    /// Reduce a non-empty slice of results into a single value.
    ///
    /// Called with exactly the `m` values the `Average` policy required;
    /// never called on an empty slice.
    fn aggregate(&self, values: &[R]) -> R;
}

impl<R, F> Aggregator<R> for F
where
    F: Fn(&[R]) -> R + Send + Sync,
{
    fn aggregate(&self, values: &[R]) -> R {
        self(values)
    }
}

/// How a [`crate::FaultTolerantClient::query`] call decides it has a good answer.
pub enum ConsistencyPolicy<R> {
    /// Require `n` responses that compare equal (by [`PartialEq`]) before
    /// returning that shared value.
    Count(usize),
    /// Collect `m` responses (no agreement required) and reduce them with
    /// `aggregator` into a single value.
    Average(usize, Box<dyn Aggregator<R> + Send + Sync>),
}

impl<R> ConsistencyPolicy<R> {
    /// The number of responses this policy needs to be satisfied.
    pub fn required(&self) -> usize {
        match self {
            ConsistencyPolicy::Count(n) => *n,
            ConsistencyPolicy::Average(m, _) => *m,
        }
    }
}

impl<R> std::fmt::Debug for ConsistencyPolicy<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsistencyPolicy::Count(n) => f.debug_tuple("Count").field(n).finish(),
            ConsistencyPolicy::Average(m, _) => f.debug_tuple("Average").field(m).finish(),
        }
    }
}

/// Immutable settings for a [`crate::FaultTolerantClient`].
///
/// Build one with [`QuorumSettingsBuilder`].
pub struct QuorumSettings<R> {
    pub(crate) policy: ConsistencyPolicy<R>,
    pub(crate) max_parallel: usize,
    pub(crate) retries: u16,
    pub(crate) retries_for_inconsistency: u16,
    pub(crate) name: Option<String>,
    pub(crate) event_listeners: EventListeners<CoordinatorEvent>,
}

impl<R> QuorumSettings<R> {
    /// Start building settings around the given consistency policy.
    pub fn builder(policy: ConsistencyPolicy<R>) -> QuorumSettingsBuilder<R> {
        QuorumSettingsBuilder::new(policy)
    }

    /// The consistency policy in effect.
    pub fn policy(&self) -> &ConsistencyPolicy<R> {
        &self.policy
    }

    /// The configured bucket fanout width.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// The configured number of retry rounds for the "no server responded"
    /// and "average fell short" failure classes.
    pub fn retries(&self) -> u16 {
        self.retries
    }

    /// The configured number of retry rounds for the "servers disagreed"
    /// failure class (`Count` policy only).
    pub fn retries_for_inconsistency(&self) -> u16 {
        self.retries_for_inconsistency
    }
}

/// Builds a [`QuorumSettings`].
///
/// ```
/// use quorum::{ConsistencyPolicy, QuorumSettings};
///
/// let settings: QuorumSettings<u64> = QuorumSettings::builder(ConsistencyPolicy::Count(2))
///     .max_parallel(4)
///     .retries(3)
///     .build();
/// assert_eq!(settings.retries(), 3);
/// ```
pub struct QuorumSettingsBuilder<R> {
    policy: ConsistencyPolicy<R>,
    max_parallel: usize,
    retries: u16,
    retries_for_inconsistency: u16,
    name: Option<String>,
    event_listeners: EventListeners<CoordinatorEvent>,
}

impl<R> QuorumSettingsBuilder<R> {
    /// Starts a builder with the given policy and the coordinator's defaults:
    /// unbounded parallelism (one bucket per server function) and no retries
    /// of either failure class.
    pub fn new(policy: ConsistencyPolicy<R>) -> Self {
        Self {
            policy,
            max_parallel: usize::MAX,
            retries: 0,
            retries_for_inconsistency: 0,
            name: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Caps the number of concurrently-running buckets.
    ///
    /// Values below 1 are clamped to 1: a coordinator that runs nothing can
    /// never satisfy any policy.
    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Sets how many additional rounds are attempted after a round comes
    /// back with no successes at all (`Count` or `Average`) or, for
    /// `Average`, with fewer than `m` successes. `0` (the default) means no
    /// retries for this failure class.
    pub fn retries(mut self, retries: u16) -> Self {
        self.retries = retries;
        self
    }

    /// Sets how many additional rounds are attempted after a `Count` round
    /// gathers successes but none reach `n` agreements. This budget is
    /// tracked independently of [`retries`](Self::retries): inconsistency
    /// among servers that *did* answer is a different failure mode from no
    /// server answering at all, and each gets its own allowance. `0` (the
    /// default) means no retries for this failure class.
    pub fn retries_for_inconsistency(mut self, retries: u16) -> Self {
        self.retries_for_inconsistency = retries;
        self
    }

    /// A name surfaced on emitted events, for distinguishing multiple
    /// coordinator instances in logs and metrics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Registers a callback invoked at the start of each attempt round
    /// (the initial fanout and every retry).
    pub fn on_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::AttemptStarted { functions, .. } = event {
                f(*functions);
            }
        }));
        self
    }

    /// Registers a callback invoked when a round comes back with no
    /// successes at all and a fresh round is about to start.
    pub fn on_retry_none_available<F>(mut self, f: F) -> Self
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::RetryNoneAvailable { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback invoked when a `Count` round produced successes
    /// but no value reached the required agreement, and a fresh round with
    /// the full function list is about to start.
    pub fn on_retry_inconsistent<F>(mut self, f: F) -> Self
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::RetryInconsistent { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback invoked when an `Average` round fell short of
    /// the required sample size, and a fresh round over the failed
    /// functions is about to start.
    pub fn on_retry_not_enough<F>(mut self, f: F) -> Self
    where
        F: Fn(u16) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::RetryNotEnough { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback invoked when a `query` call returns a value.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::QuerySucceeded { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when a `query` call raises an error.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let CoordinatorEvent::QueryFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Finishes the builder.
    pub fn build(self) -> QuorumSettings<R> {
        QuorumSettings {
            policy: self.policy,
            max_parallel: self.max_parallel,
            retries: self.retries,
            retries_for_inconsistency: self.retries_for_inconsistency,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
