//! In-memory event store.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use chronicle_core::clock::{Clock, SystemClock};
use chronicle_core::error::StoreError;
use chronicle_core::event::{PendingEvent, StreamId, VersionedEvent};
use chronicle_core::store::EventStore;
use chronicle_core::stream::EventStream;

/// In-memory event store keyed by stream identity.
///
/// The outer map lock is held only to look up or insert a stream entry; all
/// version checking and appending happens under the stream's own mutex, so
/// concurrent appends to the same identity serialize their check-then-act
/// while different identities never contend.
pub struct MemoryEventStore {
    streams: RwLock<HashMap<StreamId, Arc<Mutex<EventStream>>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryEventStore {
    /// Creates an empty store using the system clock for event timestamps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty store with an injected clock (fixed clocks in tests).
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the number of streams held.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams.read().len()
    }

    fn stream(&self, stream_id: &StreamId) -> Result<Arc<Mutex<EventStream>>, StoreError> {
        self.streams
            .read()
            .get(stream_id)
            .cloned()
            .ok_or_else(|| StoreError::StreamNotFound(stream_id.clone()))
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(
        &self,
        stream_id: StreamId,
        initial_version: u64,
        initial_events: Vec<VersionedEvent>,
    ) -> Result<(), StoreError> {
        let mut streams = self.streams.write();
        match streams.entry(stream_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::StreamAlreadyExists(stream_id)),
            Entry::Vacant(entry) => {
                let stream =
                    EventStream::from_history(stream_id.clone(), initial_version, initial_events)?;
                entry.insert(Arc::new(Mutex::new(stream)));
                tracing::debug!(stream_id = %stream_id, initial_version, "stream created");
                Ok(())
            }
        }
    }

    async fn append(
        &self,
        stream_id: &StreamId,
        expected_version: u64,
        events: Vec<PendingEvent>,
    ) -> Result<u64, StoreError> {
        let stream = self.stream(stream_id)?;
        let recorded_at = self.clock.now();
        let mut stream = stream.lock();
        stream.append(expected_version, events, recorded_at)
    }

    async fn current_version(&self, stream_id: &StreamId) -> Result<u64, StoreError> {
        let stream = self.stream(stream_id)?;
        let version = stream.lock().version();
        Ok(version)
    }

    async fn load_all(&self, stream_id: &StreamId) -> Result<Vec<VersionedEvent>, StoreError> {
        let stream = self.stream(stream_id)?;
        let events = stream.lock().events().to_vec();
        Ok(events)
    }

    async fn load_up_to(
        &self,
        stream_id: &StreamId,
        version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError> {
        let stream = self.stream(stream_id)?;
        let events = stream.lock().events_up_to(version);
        Ok(events)
    }

    async fn load_after(
        &self,
        stream_id: &StreamId,
        version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError> {
        let stream = self.stream(stream_id)?;
        let events = stream.lock().events_after(version);
        Ok(events)
    }
}
