//! The server function contract consumed by [`crate::FaultTolerantClient`].

use crate::error::ServerError;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The outcome of invoking a single server function.
pub type ServerResult<R, E> = Result<R, ServerError<E>>;

/// An opaque, possibly-fallible mapping from an argument `A` to a result `R`.
///
/// Server functions are the only thing the coordinator knows about its
/// callees: it does not know whether a function hits an HTTP endpoint, a
/// local socket, or an in-memory stub. They are cheap to clone (an `Arc`
/// around the closure) because the coordinator hands the same function to
/// multiple retry rounds.
pub type ServerFn<A, R, E> = Arc<dyn Fn(A) -> BoxFuture<'static, ServerResult<R, E>> + Send + Sync>;

/// Wraps a plain async closure as a [`ServerFn`].
///
/// ```
/// use quorum::{from_fn, error::ServerError};
///
/// #[derive(Debug, Clone, thiserror::Error)]
/// #[error("connection refused")]
/// struct ConnError;
/// impl quorum::error::Recoverable for ConnError {}
///
/// let f = from_fn(|addr: String| async move {
///     Ok::<_, ServerError<ConnError>>(format!("balance for {addr}"))
/// });
/// ```
pub fn from_fn<A, R, E, F, Fut>(f: F) -> ServerFn<A, R, E>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServerResult<R, E>> + Send + 'static,
{
    Arc::new(move |arg| Box::pin(f(arg)))
}
