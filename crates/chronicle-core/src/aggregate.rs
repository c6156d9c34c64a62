//! Aggregate runtime: event-sourced reconstruction and change tracking.

use std::sync::Arc;

use crate::dispatch::{EventHandlerDispatcher, HandlerRegistry};
use crate::error::ReplayError;
use crate::event::{DomainEvent, PendingEvent, StreamId, VersionedEvent};

/// Contract an entity type fulfils to be event-sourced.
///
/// `initialize` produces the bare entity replay starts from, and
/// `register_handlers` declares how each event type mutates it.
pub trait EventSourced: Send + Sync + Sized + 'static {
    /// Stable aggregate type name, used as the dispatcher key and in logs.
    const KIND: &'static str;

    /// Constructs a bare entity for the given identity, before any history
    /// is applied.
    fn initialize(stream_id: &StreamId) -> Self;

    /// Declares the (event type → handler) bindings for this entity type.
    fn register_handlers(registry: &mut HandlerRegistry<Self>);
}

/// A live entity coupled with its known version, its buffer of
/// not-yet-persisted events, and its dispatcher.
///
/// An aggregate lives for one unit of work: born from "new, no history" or
/// from replay, stored once, then discarded. Events arriving via replay and
/// via [`record`](Aggregate::record) go through the same dispatcher path,
/// which is what makes replay deterministic.
pub struct Aggregate<T: EventSourced> {
    stream_id: StreamId,
    entity: T,
    version: u64,
    uncommitted: Vec<PendingEvent>,
    dispatcher: Arc<EventHandlerDispatcher<T>>,
}

impl<T: EventSourced> Aggregate<T> {
    /// Creates a fresh aggregate with no history: version 0, empty buffer.
    #[must_use]
    pub fn fresh(stream_id: StreamId, dispatcher: Arc<EventHandlerDispatcher<T>>) -> Self {
        let entity = T::initialize(&stream_id);
        Self {
            stream_id,
            entity,
            version: 0,
            uncommitted: Vec::new(),
            dispatcher,
        }
    }

    /// Creates an aggregate seeded from snapshot state at `version`.
    #[must_use]
    pub const fn from_state(
        stream_id: StreamId,
        entity: T,
        version: u64,
        dispatcher: Arc<EventHandlerDispatcher<T>>,
    ) -> Self {
        Self {
            stream_id,
            entity,
            version,
            uncommitted: Vec::new(),
            dispatcher,
        }
    }

    /// Replays historical events in ascending version order.
    ///
    /// The known version advances to `target_version` only after every event
    /// has been applied; a mid-replay failure propagates and the aggregate
    /// must be discarded, never returned to a caller.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] if an event payload cannot be applied.
    pub fn replay(
        &mut self,
        events: &[VersionedEvent],
        target_version: u64,
    ) -> Result<(), ReplayError> {
        for event in events {
            self.dispatcher
                .apply(&mut self.entity, &event.event_type, &event.payload)
                .map_err(|source| ReplayError {
                    event_type: event.event_type.clone(),
                    version: event.version,
                    source,
                })?;
        }
        self.version = target_version;
        tracing::debug!(
            stream_id = %self.stream_id,
            events_replayed = events.len(),
            version = self.version,
            "aggregate replayed"
        );
        Ok(())
    }

    /// Records a new change: buffers it for persistence and immediately
    /// applies it through the dispatcher so the in-memory entity reflects it.
    ///
    /// Buffer order is the causal order of recorded changes.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the event cannot be serialized, or if
    /// its payload cannot be decoded back by the registered handler.
    pub fn record(&mut self, event: &dyn DomainEvent) -> Result<(), serde_json::Error> {
        let pending = PendingEvent::from_event(event)?;
        self.dispatcher
            .apply(&mut self.entity, &pending.event_type, &pending.payload)?;
        self.uncommitted.push(pending);
        Ok(())
    }

    /// Returns the aggregate identity.
    #[must_use]
    pub const fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    /// Returns the reconstructed entity.
    #[must_use]
    pub const fn entity(&self) -> &T {
        &self.entity
    }

    /// Returns the version this aggregate was loaded at (plus any committed
    /// stores since).
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the buffered, not-yet-persisted events in causal order.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[PendingEvent] {
        &self.uncommitted
    }

    /// Clears the buffer and advances the known version after a successful
    /// store.
    pub fn mark_committed(&mut self, new_version: u64) {
        self.uncommitted.clear();
        self.version = new_version;
    }
}
