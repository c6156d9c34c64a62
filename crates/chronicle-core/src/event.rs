//! Event and identity abstractions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, immutable identity of an event stream (one aggregate instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Creates an identity from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Trait that all domain events implement.
///
/// The core never inspects payload internals; it stores the type tag and the
/// serialized value and routes both back through the dispatcher on replay.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type tag (used for dispatch and serialization
    /// routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the payload cannot be serialized.
    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<E> DomainEvent for E
where
    E: Serialize + Send + Sync + std::fmt::Debug + EventType,
{
    fn event_type(&self) -> &'static str {
        E::EVENT_TYPE
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Associates an event struct with its stable type tag.
pub trait EventType {
    /// Stable type tag for this event (e.g. `"turnstile.coin_inserted"`).
    const EVENT_TYPE: &'static str;
}

/// A recorded change that has not yet been persisted.
///
/// Pending events carry no version: versions are assigned by the stream at
/// append time, never by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEvent {
    /// Event type tag for dispatch and deserialization routing.
    pub event_type: String,
    /// Serialized event payload, treated as opaque by the core.
    pub payload: serde_json::Value,
}

impl PendingEvent {
    /// Builds a pending event from a domain event.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json` error if the event payload cannot be
    /// serialized.
    pub fn from_event(event: &dyn DomainEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_type: event.event_type().to_owned(),
            payload: event.to_payload()?,
        })
    }
}

/// An immutable recorded change: payload plus the stream version and
/// timestamp at which it was appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEvent {
    /// Event type tag for dispatch and deserialization routing.
    pub event_type: String,
    /// Serialized event payload, treated as opaque by the core.
    pub payload: serde_json::Value,
    /// Position in the stream, assigned by the stream at append time.
    pub version: u64,
    /// Timestamp at which the event was appended.
    pub recorded_at: DateTime<Utc>,
}
