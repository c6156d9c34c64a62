//! In-memory snapshot store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use chronicle_core::error::StoreError;
use chronicle_core::event::StreamId;
use chronicle_core::store::{Snapshot, SnapshotStore};

/// In-memory latest-snapshot cache keyed by stream identity.
///
/// The read-compare-write of "does a newer snapshot already exist" runs under
/// one mutex, so a stored snapshot's version can only ever increase.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<StreamId, Snapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty snapshot store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of identities with a stored snapshot.
    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.lock().len()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn find_latest(&self, stream_id: &StreamId) -> Result<Option<Snapshot>, StoreError> {
        Ok(self.snapshots.lock().get(stream_id).cloned())
    }

    async fn store(&self, snapshot: Snapshot) -> Result<(), StoreError> {
        let mut snapshots = self.snapshots.lock();
        if let Some(existing) = snapshots.get(&snapshot.stream_id)
            && existing.version > snapshot.version
        {
            return Err(StoreError::ConcurrencyConflict {
                stream_id: snapshot.stream_id.clone(),
                expected: snapshot.version,
                actual: existing.version,
            });
        }
        tracing::debug!(
            stream_id = %snapshot.stream_id,
            version = snapshot.version,
            "snapshot stored"
        );
        snapshots.insert(snapshot.stream_id.clone(), snapshot);
        Ok(())
    }
}
