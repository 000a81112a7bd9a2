//! Failure-path scenarios: no server ever answers, and a fatal error
//! that must escape without being treated as recoverable.

use quorum::error::{Recoverable, ServerError};
use quorum::{from_fn, ConsistencyPolicy, FaultTolerantClient, QuorumSettings, ServerFn};

#[derive(Debug, Clone, thiserror::Error)]
#[error("connection refused")]
struct ConnError;
impl Recoverable for ConnError {}

fn ok(value: u64) -> ServerFn<(), u64, ConnError> {
    from_fn(move |_: ()| async move { Ok(value) })
}

fn err() -> ServerFn<(), u64, ConnError> {
    from_fn(|_: ()| async move { Err(ServerError::Recoverable(ConnError)) })
}

fn fatal() -> ServerFn<(), u64, ConnError> {
    from_fn(|_: ()| async move {
        Err(ServerError::Fatal(Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        ))))
    })
}

/// Scenario 4: both servers fail with the recoverable error, no retries
/// configured. Expect `NoneAvailable` whose cause is the first function's
/// error.
#[tokio::test]
async fn all_fail_then_none_available() {
    let client = FaultTolerantClient::new();
    let settings = QuorumSettings::builder(ConsistencyPolicy::Count(1)).build();
    let functions = vec![err(), err()];

    let result = client.query((), functions, &settings).await;

    let err = result.unwrap_err();
    assert!(err.is_none_available());
    match err {
        quorum::QueryError::NoneAvailable { cause } => {
            let _: ConnError = cause;
        }
        other => panic!("expected NoneAvailable, got {other:?}"),
    }
}

/// Scenario 5: a fatal (non-recoverable) error from one function must
/// propagate immediately, even though two other servers would otherwise
/// satisfy `Count(2)`.
#[tokio::test]
async fn fatal_error_escapes_even_when_enough_good_servers_exist() {
    let client = FaultTolerantClient::new();
    let settings = QuorumSettings::builder(ConsistencyPolicy::Count(2)).build();
    let functions = vec![fatal(), ok(7), ok(7)];

    let result = client.query((), functions, &settings).await;

    assert!(result.unwrap_err().is_fatal());
}
