//! Error types raised by the coordinator.

use std::fmt;

/// Marker for a caller's connection-level, retryable error type.
///
/// The original coordinator guarded against callers passing the universal
/// error type as `E` with a runtime check ("E must not be the ambient
/// catch-all"). In Rust that guard is unnecessary: implement `Recoverable`
/// on your own connection-error enum (or a dedicated variant of it), and a
/// [`crate::FaultTolerantClient::query`] call simply cannot be named for any `E` that
/// doesn't. There is no blanket implementation — the point is that the
/// caller deliberately nominates which of its errors are safe to swallow
/// and retry.
///
/// ```
/// #[derive(Debug, Clone, thiserror::Error)]
/// #[error("connection refused")]
/// struct ConnError;
///
/// impl quorum::error::Recoverable for ConnError {}
/// ```
pub trait Recoverable: std::error::Error + Clone + Send + Sync + 'static {}

/// What a server function failed with.
#[derive(Debug)]
pub enum ServerError<E> {
    /// A transient, connection-level failure. Swallowed and recorded by the
    /// bucket runner; may be retried under the settings' retry budgets.
    Recoverable(E),
    /// Anything else. Treated as a programming bug: propagates immediately
    /// and aborts the whole `query`, cancelling all other in-flight work.
    Fatal(Box<dyn std::error::Error + Send + Sync>),
}

impl<E: fmt::Display> fmt::Display for ServerError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Recoverable(e) => write!(f, "recoverable server error: {e}"),
            ServerError::Fatal(e) => write!(f, "fatal server error: {e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ServerError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Recoverable(e) => Some(e),
            ServerError::Fatal(e) => Some(e.as_ref()),
        }
    }
}

/// Everything that can go wrong with a [`crate::FaultTolerantClient::query`] call.
#[derive(Debug, thiserror::Error)]
pub enum QueryError<E>
where
    E: Recoverable,
{
    /// A precondition on `settings` or the function list was violated.
    /// Raised synchronously before any server is contacted; never retried.
    #[error("invalid quorum configuration: {0}")]
    Configuration(String),

    /// Every server function failed with a recoverable error, across every
    /// retry round the settings allowed.
    #[error("no server responded successfully")]
    NoneAvailable {
        /// The first recoverable error observed in the final retry round.
        #[source]
        cause: E,
    },

    /// `Average` policy: at least one server answered, but fewer than `m`
    /// ever did, across every retry round the settings allowed.
    #[error("not enough servers responded to reach the required sample size")]
    NotEnoughAvailable {
        /// The first recoverable error observed in the final retry round.
        #[source]
        cause: E,
    },

    /// `Count` policy: at least one server answered, but no value ever
    /// reached `n` agreeing responses, across every retry round the
    /// settings allowed.
    #[error(
        "results were inconsistent: {total_successes} successful responses, top agreement was {top_tally}, required {required}"
    )]
    Inconsistent {
        /// Total number of successful responses collected in the final round.
        total_successes: usize,
        /// The largest number of responses that agreed on one value.
        top_tally: usize,
        /// The agreement count the policy required.
        required: usize,
    },

    /// A server function raised an error that was not `E`. Surfaced as-is,
    /// with its original cause chain intact; all other in-flight work is
    /// cancelled best-effort.
    #[error("a server function raised a non-recoverable error")]
    Fatal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl<E: Recoverable> QueryError<E> {
    /// True if this is a [`QueryError::Configuration`] error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// True if this is a [`QueryError::NoneAvailable`] error.
    pub fn is_none_available(&self) -> bool {
        matches!(self, Self::NoneAvailable { .. })
    }

    /// True if this is a [`QueryError::NotEnoughAvailable`] error.
    pub fn is_not_enough_available(&self) -> bool {
        matches!(self, Self::NotEnoughAvailable { .. })
    }

    /// True if this is a [`QueryError::Inconsistent`] error.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::Inconsistent { .. })
    }

    /// True if this is a [`QueryError::Fatal`] error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
