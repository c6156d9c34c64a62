//! Chronicle Store — in-memory reference backends.
//!
//! [`MemoryEventStore`] and [`MemorySnapshotStore`] implement the
//! `chronicle-core` store traits without any I/O. They are the baseline the
//! concurrency contract is specified against, and double as the test
//! backends for everything built on top.

pub mod event_store;
pub mod snapshot_store;

pub use event_store::MemoryEventStore;
pub use snapshot_store::MemorySnapshotStore;
