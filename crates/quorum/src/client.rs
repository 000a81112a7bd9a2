//! The coordinator entry point.

use crate::bucket::{partition, Bucket, BucketOutcome};
use crate::config::{ConsistencyPolicy, QuorumSettings};
use crate::consistency::{evaluate, tally, ConsistencyOutcome};
use crate::error::{QueryError, Recoverable, ServerError};
use crate::events::CoordinatorEvent;
use crate::server_fn::ServerFn;
use std::time::Instant;
use tokio::task::JoinSet;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Cross-checks a set of equivalent server functions and returns a value
/// that satisfies the caller's [`ConsistencyPolicy`].
///
/// `FaultTolerantClient` carries no state between calls: every [`query`](Self::query)
/// call is independent, so a single client can be shared (it is zero-sized)
/// across any number of concurrent callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaultTolerantClient;

impl FaultTolerantClient {
    /// Creates a new client.
    pub fn new() -> Self {
        #[cfg(feature = "metrics")]
        {
            describe_counter!(
                "quorum_calls_total",
                "Total number of query() calls, by outcome"
            );
            describe_counter!(
                "quorum_attempts_total",
                "Total number of attempt rounds across all query() calls"
            );
            describe_counter!(
                "quorum_retries_total",
                "Total number of retry rounds started, by failure class"
            );
            describe_histogram!(
                "quorum_query_duration",
                "Wall-clock duration of a query() call, in seconds"
            );
        }

        Self
    }

    /// Calls every server function in `functions` with the same `argument`,
    /// retrying and cross-checking the responses according to `settings`,
    /// and returns the first value that satisfies the configured
    /// [`ConsistencyPolicy`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Configuration`] synchronously, before any
    /// server is contacted, if `functions` is empty or shorter than the
    /// number of responses the policy requires.
    ///
    /// Returns [`QueryError::Fatal`] the moment any server function raises a
    /// [`ServerError::Fatal`]; all other in-flight work is cancelled
    /// best-effort and the original error is returned unmodified.
    ///
    /// Returns [`QueryError::NoneAvailable`] or [`QueryError::NotEnoughAvailable`]
    /// if no server ever answers (or, for `Average`, too few ever do) within
    /// `settings.retries()` additional rounds, and [`QueryError::Inconsistent`]
    /// if a `Count` policy gathers successes that never reach `n` agreements
    /// within `settings.retries_for_inconsistency()` additional rounds — a
    /// budget tracked independently of `retries()`, since "nobody answered"
    /// and "everybody answered but disagreed" are different failure modes.
    pub async fn query<A, R, E>(
        &self,
        argument: A,
        functions: Vec<ServerFn<A, R, E>>,
        settings: &QuorumSettings<R>,
    ) -> Result<R, QueryError<E>>
    where
        A: Clone + Send + 'static,
        R: Clone + PartialEq + Send + 'static,
        E: Recoverable,
    {
        let start = Instant::now();
        validate(&functions, settings)?;

        let name = settings.name.as_deref().unwrap_or("quorum").to_string();
        let originals = functions;
        let mut active: Vec<usize> = (0..originals.len()).collect();
        let mut carried: Vec<R> = Vec::new();
        let mut carried_failures: Vec<(usize, E)> = Vec::new();
        let mut attempt: u16 = 0;
        let mut inconsistency_attempt: u16 = 0;

        loop {
            settings.event_listeners.emit(&CoordinatorEvent::AttemptStarted {
                name: settings.name.clone(),
                functions: active.len(),
                timestamp: Instant::now(),
            });
            #[cfg(feature = "metrics")]
            counter!("quorum_attempts_total", "quorum" => name.clone()).increment(1);
            #[cfg(feature = "tracing")]
            debug!(quorum = %name, functions = active.len(), "starting quorum attempt round");

            let buckets: Vec<Bucket<A, R, E>> = active
                .iter()
                .map(|&index| Bucket {
                    func: originals[index].clone(),
                    arg: argument.clone(),
                    index,
                })
                .collect();
            let groups = partition(buckets, settings.max_parallel);

            match run_round(groups, &settings.policy, &carried).await {
                RoundOutcome::Fatal(err) => {
                    let result = Err(QueryError::Fatal(err));
                    self.emit_finished(settings, &name, start, false);
                    return result;
                }
                RoundOutcome::Satisfied(value) => {
                    #[cfg(feature = "tracing")]
                    {
                        if attempt > 0 || inconsistency_attempt > 0 {
                            info!(quorum = %name, attempt, inconsistency_attempt, "quorum satisfied after retries");
                        } else {
                            debug!(quorum = %name, "quorum satisfied on first attempt");
                        }
                    }
                    self.emit_finished(settings, &name, start, true);
                    return Ok(value);
                }
                RoundOutcome::Unsatisfied {
                    new_successes,
                    failures,
                } => {
                    let any_success = !carried.is_empty() || !new_successes.is_empty();

                    if !any_success {
                        if attempt >= settings.retries {
                            let cause = failures
                                .into_iter()
                                .next()
                                .map(|(_, e)| e)
                                .expect("no successes implies at least one failure");
                            #[cfg(feature = "tracing")]
                            warn!(quorum = %name, attempt, "no server responded successfully, retry budget exhausted");
                            self.emit_finished(settings, &name, start, false);
                            return Err(QueryError::NoneAvailable { cause });
                        }
                        attempt += 1;
                        settings.event_listeners.emit(&CoordinatorEvent::RetryNoneAvailable {
                            name: settings.name.clone(),
                            attempt,
                            timestamp: Instant::now(),
                        });
                        #[cfg(feature = "metrics")]
                        counter!("quorum_retries_total", "quorum" => name.clone(), "reason" => "none_available")
                            .increment(1);
                        #[cfg(feature = "tracing")]
                        debug!(quorum = %name, attempt, "no server responded, retrying");
                        active = failures.into_iter().map(|(i, _)| i).collect();
                        carried = Vec::new();
                        continue;
                    }

                    match &settings.policy {
                        ConsistencyPolicy::Count(n) => {
                            if inconsistency_attempt >= settings.retries_for_inconsistency {
                                let values: Vec<R> =
                                    new_successes.into_iter().map(|(_, v)| v).collect();
                                let top_tally =
                                    tally(&values).first().map(|(_, c)| *c).unwrap_or(0);
                                #[cfg(feature = "tracing")]
                                warn!(
                                    quorum = %name,
                                    inconsistency_attempt,
                                    total_successes = values.len(),
                                    top_tally,
                                    required = *n,
                                    "results never reached the required agreement"
                                );
                                self.emit_finished(settings, &name, start, false);
                                return Err(QueryError::Inconsistent {
                                    total_successes: values.len(),
                                    top_tally,
                                    required: *n,
                                });
                            }
                            inconsistency_attempt += 1;
                            settings.event_listeners.emit(&CoordinatorEvent::RetryInconsistent {
                                name: settings.name.clone(),
                                attempt: inconsistency_attempt,
                                timestamp: Instant::now(),
                            });
                            #[cfg(feature = "metrics")]
                            counter!("quorum_retries_total", "quorum" => name.clone(), "reason" => "inconsistent")
                                .increment(1);
                            #[cfg(feature = "tracing")]
                            debug!(quorum = %name, inconsistency_attempt, "results disagreed, retrying with the full function list");
                            active = (0..originals.len()).collect();
                            carried = Vec::new();
                        }
                        ConsistencyPolicy::Average(_, _) => {
                            let mut combined = carried.clone();
                            combined.extend(new_successes.into_iter().map(|(_, v)| v));

                            let failed_indices: Vec<usize> =
                                failures.iter().map(|(i, _)| *i).collect();
                            carried_failures.extend(failures);

                            if attempt >= settings.retries {
                                let cause = carried_failures
                                    .into_iter()
                                    .next()
                                    .map(|(_, e)| e)
                                    .expect("not-enough-available implies at least one failure");
                                #[cfg(feature = "tracing")]
                                warn!(quorum = %name, attempt, "not enough servers responded, retry budget exhausted");
                                self.emit_finished(settings, &name, start, false);
                                return Err(QueryError::NotEnoughAvailable { cause });
                            }
                            attempt += 1;
                            settings.event_listeners.emit(&CoordinatorEvent::RetryNotEnough {
                                name: settings.name.clone(),
                                attempt,
                                timestamp: Instant::now(),
                            });
                            #[cfg(feature = "metrics")]
                            counter!("quorum_retries_total", "quorum" => name.clone(), "reason" => "not_enough")
                                .increment(1);
                            #[cfg(feature = "tracing")]
                            debug!(quorum = %name, attempt, "not enough servers responded yet, retrying the failed ones");
                            active = failed_indices;
                            carried = combined;
                        }
                    }
                }
            }
        }
    }

    fn emit_finished<R>(&self, settings: &QuorumSettings<R>, name: &str, start: Instant, ok: bool) {
        let duration = start.elapsed();
        let event = if ok {
            CoordinatorEvent::QuerySucceeded {
                name: settings.name.clone(),
                duration,
                timestamp: Instant::now(),
            }
        } else {
            CoordinatorEvent::QueryFailed {
                name: settings.name.clone(),
                duration,
                timestamp: Instant::now(),
            }
        };
        settings.event_listeners.emit(&event);

        #[cfg(feature = "metrics")]
        {
            let result = if ok { "success" } else { "failure" };
            counter!("quorum_calls_total", "quorum" => name.to_string(), "result" => result)
                .increment(1);
            histogram!("quorum_query_duration", "quorum" => name.to_string())
                .record(duration.as_secs_f64());
        }
    }
}

fn validate<A, R, E>(
    functions: &[ServerFn<A, R, E>],
    settings: &QuorumSettings<R>,
) -> Result<(), QueryError<E>>
where
    E: Recoverable,
{
    if functions.is_empty() {
        return Err(QueryError::Configuration(
            "no server functions provided".to_string(),
        ));
    }
    let required = settings.policy.required();
    if required == 0 {
        return Err(QueryError::Configuration(
            "a consistency policy must require at least one response".to_string(),
        ));
    }
    if required > functions.len() {
        return Err(QueryError::Configuration(format!(
            "policy requires {required} responses but only {} server functions were given",
            functions.len()
        )));
    }
    if let ConsistencyPolicy::Average(m, _) = &settings.policy {
        if *m > settings.max_parallel {
            return Err(QueryError::Configuration(format!(
                "average policy requires {m} responses but max_parallel is only {}",
                settings.max_parallel
            )));
        }
    }
    Ok(())
}

/// The outcome of one attempt round.
enum RoundOutcome<R, E> {
    /// The policy was satisfied; here is the value.
    Satisfied(R),
    /// A server function raised a non-recoverable error; the round was
    /// aborted immediately.
    Fatal(Box<dyn std::error::Error + Send + Sync>),
    /// The round ran to completion without satisfying the policy.
    Unsatisfied {
        /// Successes collected during this round only (not `seed`).
        new_successes: Vec<(usize, R)>,
        failures: Vec<(usize, E)>,
    },
}

/// Runs one attempt round: buckets execute in parallel (up to `max_parallel`
/// concurrently, sequentially within each bucket), and the policy is
/// re-evaluated — against `seed` plus every success collected so far this
/// round — after each individual completion, so the round can return the
/// moment the policy is satisfied without waiting for stragglers.
async fn run_round<A, R, E>(
    buckets: Vec<Vec<Bucket<A, R, E>>>,
    policy: &ConsistencyPolicy<R>,
    seed: &[R],
) -> RoundOutcome<R, E>
where
    A: Send + 'static,
    R: Clone + PartialEq + Send + 'static,
    E: Send + 'static,
{
    let mut queues: Vec<std::collections::VecDeque<Bucket<A, R, E>>> =
        buckets.into_iter().map(std::collections::VecDeque::from).collect();
    let mut join_set: JoinSet<(usize, BucketOutcome<R, E>)> = JoinSet::new();

    for (group, queue) in queues.iter_mut().enumerate() {
        if let Some(bucket) = queue.pop_front() {
            join_set.spawn(async move { (group, bucket.run().await) });
        }
    }

    let mut values: Vec<R> = seed.to_vec();
    let mut new_successes: Vec<(usize, R)> = Vec::new();
    let mut failures: Vec<(usize, E)> = Vec::new();

    while let Some(joined) = join_set.join_next().await {
        let (group, outcome) = joined.expect("bucket task panicked");

        match outcome.result {
            Ok(value) => {
                values.push(value.clone());
                new_successes.push((outcome.index, value));

                if let ConsistencyOutcome::Satisfied(satisfied) = evaluate(&values, policy) {
                    join_set.abort_all();
                    return RoundOutcome::Satisfied(satisfied);
                }
            }
            Err(ServerError::Recoverable(e)) => failures.push((outcome.index, e)),
            Err(ServerError::Fatal(e)) => {
                join_set.abort_all();
                return RoundOutcome::Fatal(e);
            }
        }

        if let Some(bucket) = queues[group].pop_front() {
            join_set.spawn(async move { (group, bucket.run().await) });
        }
    }

    RoundOutcome::Unsatisfied {
        new_successes,
        failures,
    }
}
