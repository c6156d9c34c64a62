//! Test stores — failing `EventStore`/`SnapshotStore` implementations for
//! error-handling paths.

use async_trait::async_trait;

use chronicle_core::error::StoreError;
use chronicle_core::event::{PendingEvent, StreamId, VersionedEvent};
use chronicle_core::store::{EventStore, Snapshot, SnapshotStore};

/// An event store whose every operation fails with a backend error.
#[derive(Debug, Default)]
pub struct FailingEventStore;

fn backend_down() -> StoreError {
    StoreError::Backend("connection refused".into())
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn create(
        &self,
        _stream_id: StreamId,
        _initial_version: u64,
        _initial_events: Vec<VersionedEvent>,
    ) -> Result<(), StoreError> {
        Err(backend_down())
    }

    async fn append(
        &self,
        _stream_id: &StreamId,
        _expected_version: u64,
        _events: Vec<PendingEvent>,
    ) -> Result<u64, StoreError> {
        Err(backend_down())
    }

    async fn current_version(&self, _stream_id: &StreamId) -> Result<u64, StoreError> {
        Err(backend_down())
    }

    async fn load_all(&self, _stream_id: &StreamId) -> Result<Vec<VersionedEvent>, StoreError> {
        Err(backend_down())
    }

    async fn load_up_to(
        &self,
        _stream_id: &StreamId,
        _version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError> {
        Err(backend_down())
    }

    async fn load_after(
        &self,
        _stream_id: &StreamId,
        _version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError> {
        Err(backend_down())
    }
}

/// A snapshot store whose every operation fails with a backend error.
#[derive(Debug, Default)]
pub struct FailingSnapshotStore;

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn find_latest(&self, _stream_id: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        Err(backend_down())
    }

    async fn store(&self, _snapshot: Snapshot) -> Result<(), StoreError> {
        Err(backend_down())
    }
}

/// A snapshot store that never holds anything: `find_latest` is always
/// `None` and `store` silently accepts. Useful for exercising full replays.
#[derive(Debug, Default)]
pub struct EmptySnapshotStore;

#[async_trait]
impl SnapshotStore for EmptySnapshotStore {
    async fn find_latest(&self, _stream_id: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        Ok(None)
    }

    async fn store(&self, _snapshot: Snapshot) -> Result<(), StoreError> {
        Ok(())
    }
}
