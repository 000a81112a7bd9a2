//! Shared infrastructure for the `quorum` crate.
//!
//! This crate provides the event system used for observability: a
//! [`ResilienceEvent`](events::ResilienceEvent) trait every emitted event
//! implements, and an [`EventListeners`](events::EventListeners) registry
//! that fans an event out to every registered listener.

pub mod events;

pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
