//! Chronicle Core — event-sourced persistence abstractions.
//!
//! This crate defines the building blocks of the event store: identities,
//! versioned events, streams, the store traits, the per-type event dispatcher,
//! the aggregate runtime, and the repository that orchestrates them. It
//! contains no backend code; see `chronicle-store` for the in-memory
//! reference backends.

pub mod aggregate;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod repository;
pub mod store;
pub mod stream;
