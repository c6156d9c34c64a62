//! Store abstractions: event streams and snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::event::{PendingEvent, StreamId, VersionedEvent};

/// Compacted aggregate state at a known version.
///
/// Snapshots are a pure optimization: they are created by an external policy,
/// superseded rather than edited, and never treated as the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// The aggregate identity this snapshot belongs to.
    pub stream_id: StreamId,
    /// The stream version the state was captured at.
    pub version: u64,
    /// Opaque serialized aggregate state.
    pub state: serde_json::Value,
    /// Timestamp at which the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// Keyed collection of event streams with optimistic concurrency.
///
/// Implementations must serialize the read-version/write-version steps of
/// `append` per identity; different identities must not contend with each
/// other. Callers must treat every operation as potentially blocking, since
/// durable backends may perform I/O.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Creates a stream for `stream_id` whose version is `initial_version`
    /// and whose history is exactly `initial_events` (already-versioned
    /// records, used for seeding/import; the common path passes `0, vec![]`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamAlreadyExists`] if the identity is already
    /// known, or [`StoreError::InvalidCreate`] for a malformed seed history.
    async fn create(
        &self,
        stream_id: StreamId,
        initial_version: u64,
        initial_events: Vec<VersionedEvent>,
    ) -> Result<(), StoreError>;

    /// Appends `events` to the stream under an optimistic concurrency check
    /// and returns the new current version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamNotFound`] if the identity is unknown, or
    /// [`StoreError::ConcurrencyConflict`] if the stream's current version
    /// differs from `expected_version` (the stream is left unchanged).
    async fn append(
        &self,
        stream_id: &StreamId,
        expected_version: u64,
        events: Vec<PendingEvent>,
    ) -> Result<u64, StoreError>;

    /// Returns the current version of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamNotFound`] if the identity is unknown.
    async fn current_version(&self, stream_id: &StreamId) -> Result<u64, StoreError>;

    /// Loads the full history in ascending version order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamNotFound`] if the identity is unknown.
    async fn load_all(&self, stream_id: &StreamId) -> Result<Vec<VersionedEvent>, StoreError>;

    /// Loads events with version ≤ `version` (inclusive), ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamNotFound`] if the identity is unknown.
    async fn load_up_to(
        &self,
        stream_id: &StreamId,
        version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError>;

    /// Loads events with version > `version` (exclusive), ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamNotFound`] if the identity is unknown.
    async fn load_after(
        &self,
        stream_id: &StreamId,
        version: u64,
    ) -> Result<Vec<VersionedEvent>, StoreError>;
}

/// Keyed latest-snapshot cache.
///
/// Deliberately weaker than the event store's concurrency check: there is no
/// expected-version token, only the rule that a stored snapshot's version
/// never regresses.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the most recent snapshot for the identity, if any. Absence is
    /// a normal state meaning "replay from the beginning".
    ///
    /// # Errors
    ///
    /// Returns a store error only on backend failure.
    async fn find_latest(&self, stream_id: &StreamId) -> Result<Option<Snapshot>, StoreError>;

    /// Stores `snapshot` unless a newer one is already held for the same
    /// identity. Equal versions are accepted as an idempotent overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrencyConflict`] if the stored snapshot's
    /// version is greater than the offered one.
    async fn store(&self, snapshot: Snapshot) -> Result<(), StoreError>;
}
