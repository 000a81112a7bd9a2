//! Partitioning server functions into buckets and running one to completion.

use crate::error::ServerError;
use crate::server_fn::ServerFn;

/// One server function paired with the argument it will be invoked with.
pub(crate) struct Bucket<A, R, E> {
    pub(crate) func: ServerFn<A, R, E>,
    pub(crate) arg: A,
    /// Index into the original function list, used to report which function
    /// produced a given outcome and to rebuild a failed-only function list
    /// for the next retry round.
    pub(crate) index: usize,
}

impl<A, R, E> Bucket<A, R, E> {
    pub(crate) async fn run(self) -> BucketOutcome<R, E> {
        let result = (self.func)(self.arg).await;
        BucketOutcome {
            index: self.index,
            result,
        }
    }
}

/// The result of running one [`Bucket`] to completion.
pub(crate) struct BucketOutcome<R, E> {
    pub(crate) index: usize,
    pub(crate) result: Result<R, ServerError<E>>,
}

/// Splits `items` into at most `max_parallel` buckets as evenly as possible.
///
/// The first `items.len() % max_parallel` buckets get one extra item
/// (ceil), the rest get `items.len() / max_parallel` (floor); every item
/// appears in exactly one bucket group, and bucket groups are returned in
/// the same relative order as `items`. When `items.len() <= max_parallel`,
/// every bucket group has exactly one item.
pub(crate) fn partition<T>(items: Vec<T>, max_parallel: usize) -> Vec<Vec<T>> {
    debug_assert!(max_parallel >= 1);
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let groups = max_parallel.min(total).max(1);
    let base = total / groups;
    let remainder = total % groups;

    let mut out: Vec<Vec<T>> = Vec::with_capacity(groups);
    let mut iter = items.into_iter();
    for g in 0..groups {
        let size = if g < remainder { base + 1 } else { base };
        let mut bucket = Vec::with_capacity(size);
        for _ in 0..size {
            // `size` items remain in `iter` for every group by construction.
            bucket.push(iter.next().expect("partition size computed from items.len()"));
        }
        out.push(bucket);
    }
    debug_assert!(iter.next().is_none());
    out
}
