//! `Count` policy scenarios: agreement, split votes, and retrying
//! inconsistent rounds under their own budget.

use quorum::error::{Recoverable, ServerError};
use quorum::{from_fn, ConsistencyPolicy, FaultTolerantClient, QuorumSettings, ServerFn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, thiserror::Error)]
#[error("connection refused")]
struct ConnError;
impl Recoverable for ConnError {}

fn counting_ok(value: u64, calls: Arc<AtomicUsize>) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    })
}

fn ok(value: u64) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| async move { Ok(value) })
}

/// Scenario 1: three servers, require 2 consistent, all return 42.
/// Expect `42`, with exactly 2 or 3 server calls made.
#[tokio::test]
async fn three_servers_all_agree_reaches_count_two() {
    let calls = Arc::new(AtomicUsize::new(0));
    let client = FaultTolerantClient::new();
    let settings = QuorumSettings::builder(ConsistencyPolicy::Count(2))
        .max_parallel(3)
        .build();
    let functions = vec![
        counting_ok(42, Arc::clone(&calls)),
        counting_ok(42, Arc::clone(&calls)),
        counting_ok(42, Arc::clone(&calls)),
    ];

    let result = client.query((), functions, &settings).await;

    assert_eq!(result.unwrap(), 42);
    let made = calls.load(Ordering::SeqCst);
    assert!((2..=3).contains(&made), "expected 2 or 3 calls, got {made}");
}

/// Scenario 2: split vote, two servers agree on 1 and one on 2. With
/// `retries_for_inconsistency` at its default of 0, the first fanout must
/// already settle on the majority value.
#[tokio::test]
async fn split_vote_settles_on_the_majority_value() {
    let client = FaultTolerantClient::new();
    let settings = QuorumSettings::builder(ConsistencyPolicy::Count(2))
        .max_parallel(3)
        .build();
    let functions = vec![ok(1), ok(1), ok(2)];

    let result = client.query((), functions, &settings).await;

    assert_eq!(result.unwrap(), 1);
}

/// Scenario 6: six servers that never agree, `retries_for_inconsistency(1)`.
/// Expect exactly one retry, then `Inconsistent(total=6, top=1, required=2)`
/// — the final round's tally, not a sum across rounds.
#[tokio::test]
async fn inconsistency_retry_consumes_its_own_budget_then_reports_the_final_tally() {
    // Tracks which attempt round is currently in flight, so every function
    // returns a value unique to (round, function index) and rounds never
    // happen to agree by coincidence.
    let round = Arc::new(AtomicUsize::new(0));

    let functions: Vec<ServerFn<(), u64, ConnError>> = (0..6u64)
        .map(|i| {
            let round = Arc::clone(&round);
            from_fn(move |_: ()| {
                let round = Arc::clone(&round);
                async move {
                    let r = round.load(Ordering::SeqCst) as u64;
                    Ok::<_, ServerError<ConnError>>(r * 100 + i)
                }
            })
        })
        .collect();

    let round_for_listener = Arc::clone(&round);
    let client = FaultTolerantClient::new();
    let settings = QuorumSettings::builder(ConsistencyPolicy::Count(2))
        .retries_for_inconsistency(1)
        .on_retry_inconsistent(move |_attempt| {
            round_for_listener.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let result = client.query((), functions, &settings).await;

    let err = result.unwrap_err();
    assert!(err.is_inconsistent());
    match err {
        quorum::QueryError::Inconsistent {
            total_successes,
            top_tally,
            required,
        } => {
            assert_eq!(total_successes, 6);
            assert_eq!(top_tally, 1);
            assert_eq!(required, 2);
        }
        other => panic!("expected Inconsistent, got {other:?}"),
    }
    // One retry round ran: the initial fanout plus exactly one retry.
    assert_eq!(round.load(Ordering::SeqCst), 1);
}
