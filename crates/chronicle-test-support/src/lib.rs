//! Shared test doubles and fixtures for the chronicle crates.

pub mod clock;
pub mod fixtures;
pub mod stores;

pub use clock::FixedClock;
pub use fixtures::{AccountOpened, Credited, Debited, LedgerAccount};
pub use stores::{EmptySnapshotStore, FailingEventStore, FailingSnapshotStore};
