//! Fault-tolerant parallel query coordinator.
//!
//! `quorum` calls a set of equivalent server functions in parallel and
//! cross-checks their responses against a pluggable [`ConsistencyPolicy`]
//! before returning a value to the caller — either `n` responses that agree
//! (`Count`), or `m` responses reduced through a caller-supplied aggregator
//! (`Average`). Failed rounds can be retried a configured number of times,
//! narrowing the set of functions re-contacted based on which case of
//! failure occurred.
//!
//! ```
//! use quorum::{ConsistencyPolicy, FaultTolerantClient, QuorumSettings, from_fn};
//! use quorum::error::ServerError;
//!
//! #[derive(Debug, Clone, thiserror::Error)]
//! #[error("connection refused")]
//! struct ConnError;
//! impl quorum::error::Recoverable for ConnError {}
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = QuorumSettings::builder(ConsistencyPolicy::Count(2))
//!     .retries(1)
//!     .build();
//!
//! let functions = vec![
//!     from_fn(|_: ()| async { Ok::<_, ServerError<ConnError>>(1u64) }),
//!     from_fn(|_: ()| async { Ok::<_, ServerError<ConnError>>(1u64) }),
//!     from_fn(|_: ()| async { Ok::<_, ServerError<ConnError>>(2u64) }),
//! ];
//!
//! let client = FaultTolerantClient::new();
//! let value = client.query((), functions, &settings).await?;
//! assert_eq!(value, 1);
//! # Ok(())
//! # }
//! ```

mod bucket;
mod client;
mod consistency;
pub mod config;
pub mod error;
pub mod events;
mod server_fn;

pub use client::FaultTolerantClient;
pub use config::{Aggregator, ConsistencyPolicy, QuorumSettings, QuorumSettingsBuilder};
pub use error::QueryError;
pub use events::CoordinatorEvent;
pub use server_fn::{from_fn, ServerFn, ServerResult};
