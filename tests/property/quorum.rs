//! Property tests for the quorum coordinator.
//!
//! Invariants tested:
//! - Budget respect: never more than `max_parallel` calls in flight at once
//! - First-cause preservation: `NoneAvailable`'s cause is the first failure
//! - `Count` policy monotonicity: the majority value wins regardless of how
//!   many distinct, non-agreeing fillers are mixed in

use proptest::prelude::*;
use quorum::error::{Recoverable, ServerError};
use quorum::{from_fn, ConsistencyPolicy, FaultTolerantClient, QuorumSettings, ServerFn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, thiserror::Error)]
#[error("connection refused #{id}")]
struct ConnError {
    id: usize,
}
impl Recoverable for ConnError {}

fn slow_ok(
    value: u64,
    current: Arc<AtomicUsize>,
    high_water: Arc<AtomicUsize>,
) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| {
        let current = Arc::clone(&current);
        let high_water = Arc::clone(&high_water);
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            high_water.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(value)
        }
    })
}

fn failing(id: usize) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| async move { Err(ServerError::Recoverable(ConnError { id })) })
}

fn ok(value: u64) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| async move { Ok(value) })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: at no point are more than `max_parallel` server calls
    /// outstanding, regardless of how many functions or how wide the
    /// parallel budget is.
    #[test]
    fn budget_respect(
        total in 1usize..=12,
        max_parallel in 1usize..=6,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let current = Arc::new(AtomicUsize::new(0));
            let high_water = Arc::new(AtomicUsize::new(0));

            let functions: Vec<ServerFn<(), u64, ConnError>> = (0..total)
                .map(|_| slow_ok(1, Arc::clone(&current), Arc::clone(&high_water)))
                .collect();

            let client = FaultTolerantClient::new();
            // Count(total) forces every function to be awaited so the peak
            // concurrency across the whole round is observable.
            let settings = QuorumSettings::builder(ConsistencyPolicy::Count(total))
                .max_parallel(max_parallel)
                .build();

            let result = client.query((), functions, &settings).await;
            prop_assert!(result.is_ok());

            let peak = high_water.load(Ordering::SeqCst);
            prop_assert!(
                peak <= max_parallel,
                "observed {} concurrent calls but max_parallel was {}",
                peak,
                max_parallel
            );

            Ok(())
        })?;
    }

    /// Property: when every function fails and no retries are configured,
    /// `NoneAvailable`'s cause is the error from the first function in
    /// declaration order, never a later one.
    #[test]
    fn first_cause_preservation(
        total in 1usize..=8,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let functions: Vec<ServerFn<(), u64, ConnError>> =
                (0..total).map(failing).collect();

            let client = FaultTolerantClient::new();
            let settings = QuorumSettings::builder(ConsistencyPolicy::Count(1)).build();

            let result = client.query((), functions, &settings).await;
            let err = result.unwrap_err();
            prop_assert!(err.is_none_available());
            match err {
                quorum::QueryError::NoneAvailable { cause } => {
                    prop_assert_eq!(cause.id, 0);
                }
                other => prop_assert!(false, "expected NoneAvailable, got {:?}", other),
            }

            Ok(())
        })?;
    }

    /// Property: once `n` functions agree on a value, `query` returns that
    /// value — additional, distinct filler results mixed into the same
    /// round cannot change the outcome.
    #[test]
    fn count_policy_returns_the_value_with_enough_agreement(
        n in 1usize..=4,
        extra_fillers in 0usize..=5,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            const AGREED_VALUE: u64 = 777;

            let mut functions: Vec<ServerFn<(), u64, ConnError>> =
                (0..n).map(|_| ok(AGREED_VALUE)).collect();
            // Every filler returns a value distinct from AGREED_VALUE and
            // from every other filler, so none of them can themselves reach
            // a tally of `n`.
            for i in 0..extra_fillers {
                functions.push(ok(1000 + i as u64));
            }

            let client = FaultTolerantClient::new();
            let settings = QuorumSettings::builder(ConsistencyPolicy::Count(n)).build();

            let result = client.query((), functions, &settings).await;
            prop_assert_eq!(result.unwrap(), AGREED_VALUE);

            Ok(())
        })?;
    }
}
