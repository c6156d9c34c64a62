//! Ordered event history for a single aggregate identity.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::event::{PendingEvent, StreamId, VersionedEvent};

/// One aggregate's append-only event history plus its current version.
///
/// Events are held in ascending version order with no gaps; the vector is
/// only ever extended, never mutated or reordered in place. Version is the
/// sole concurrency token: the append check is a plain compare against the
/// current version, executed inside the owning store's per-identity critical
/// section.
#[derive(Debug, Clone)]
pub struct EventStream {
    stream_id: StreamId,
    version: u64,
    events: Vec<VersionedEvent>,
}

impl EventStream {
    /// Creates an empty stream at version 0.
    #[must_use]
    pub const fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            version: 0,
            events: Vec::new(),
        }
    }

    /// Creates a stream from an already-versioned seed history (the
    /// import/seed path of `EventStore::create`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCreate`] if the seed events are not
    /// strictly ascending or do not end exactly at `initial_version`.
    pub fn from_history(
        stream_id: StreamId,
        initial_version: u64,
        initial_events: Vec<VersionedEvent>,
    ) -> Result<Self, StoreError> {
        let mut previous: Option<u64> = None;
        for event in &initial_events {
            if event.version == 0 || previous.is_some_and(|p| event.version <= p) {
                return Err(StoreError::InvalidCreate {
                    stream_id,
                    reason: format!(
                        "seed versions must be strictly ascending and positive, got {}",
                        event.version
                    ),
                });
            }
            previous = Some(event.version);
        }
        if let Some(last) = previous
            && last != initial_version
        {
            return Err(StoreError::InvalidCreate {
                stream_id,
                reason: format!("seed history ends at version {last}, expected {initial_version}"),
            });
        }
        Ok(Self {
            stream_id,
            version: initial_version,
            events: initial_events,
        })
    }

    /// Returns the stream identity.
    #[must_use]
    pub const fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Returns the current version (the version of the last event, or the
    /// seed version for a freshly created stream).
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Appends `events` under an optimistic concurrency check.
    ///
    /// Each pending event is assigned the next version in call order and
    /// stamped with `recorded_at`. Returns the new current version. On
    /// failure the stream is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrencyConflict`] if the stream's current
    /// version differs from `expected_version`.
    pub fn append(
        &mut self,
        expected_version: u64,
        events: Vec<PendingEvent>,
        recorded_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if self.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                stream_id: self.stream_id.clone(),
                expected: expected_version,
                actual: self.version,
            });
        }

        self.events.reserve(events.len());
        for event in events {
            self.version += 1;
            self.events.push(VersionedEvent {
                event_type: event.event_type,
                payload: event.payload,
                version: self.version,
                recorded_at,
            });
        }
        tracing::trace!(
            stream_id = %self.stream_id,
            version = self.version,
            "events appended to stream"
        );
        Ok(self.version)
    }

    /// Returns the full history in ascending version order.
    #[must_use]
    pub fn events(&self) -> &[VersionedEvent] {
        &self.events
    }

    /// Returns events with version ≤ `version`, ascending.
    #[must_use]
    pub fn events_up_to(&self, version: u64) -> Vec<VersionedEvent> {
        let end = self.events.partition_point(|e| e.version <= version);
        self.events[..end].to_vec()
    }

    /// Returns events with version strictly greater than `version`,
    /// ascending.
    #[must_use]
    pub fn events_after(&self, version: u64) -> Vec<VersionedEvent> {
        let start = self.events.partition_point(|e| e.version <= version);
        self.events[start..].to_vec()
    }
}
