//! Deciding whether a round of collected results satisfies a [`ConsistencyPolicy`].

use crate::config::{Aggregator, ConsistencyPolicy};

/// The result of evaluating a completed round of successes against a policy.
pub(crate) enum ConsistencyOutcome<R> {
    /// The policy was satisfied; here is the value to return to the caller.
    Satisfied(R),
    /// Not enough agreement yet under a `Count` policy.
    Inconsistent {
        total_successes: usize,
        top_tally: usize,
        required: usize,
    },
    /// Not enough responses yet under an `Average` policy.
    NotEnough { collected: usize, required: usize },
}

/// Groups `values` by equality and returns `(value, count)` pairs sorted by
/// count descending. Ties keep the order the values first appeared in.
///
/// `O(n^2)` in the number of values: quorum rounds are sized to a handful of
/// servers, so a linear scan per value is simpler and faster in practice
/// than hashing a type that is only required to be `PartialEq`.
pub(crate) fn tally<R: PartialEq + Clone>(values: &[R]) -> Vec<(R, usize)> {
    let mut groups: Vec<(R, usize)> = Vec::new();
    for v in values {
        if let Some(existing) = groups.iter_mut().find(|(g, _)| g == v) {
            existing.1 += 1;
        } else {
            groups.push((v.clone(), 1));
        }
    }
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    groups
}

/// Evaluates one round's collected successes against `policy`.
pub(crate) fn evaluate<R: PartialEq + Clone>(
    successes: &[R],
    policy: &ConsistencyPolicy<R>,
) -> ConsistencyOutcome<R> {
    match policy {
        ConsistencyPolicy::Count(n) => {
            let groups = tally(successes);
            match groups.first() {
                Some((value, count)) if *count >= *n => ConsistencyOutcome::Satisfied(value.clone()),
                Some((_, count)) => ConsistencyOutcome::Inconsistent {
                    total_successes: successes.len(),
                    top_tally: *count,
                    required: *n,
                },
                None => ConsistencyOutcome::Inconsistent {
                    total_successes: 0,
                    top_tally: 0,
                    required: *n,
                },
            }
        }
        ConsistencyPolicy::Average(m, aggregator) => {
            if successes.len() >= *m {
                ConsistencyOutcome::Satisfied(aggregator.aggregate(&successes[..*m]))
            } else {
                ConsistencyOutcome::NotEnough {
                    collected: successes.len(),
                    required: *m,
                }
            }
        }
    }
}
