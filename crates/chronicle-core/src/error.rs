//! Error taxonomy for the persistence core.

use thiserror::Error;

use crate::event::StreamId;

/// Errors produced by event and snapshot stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation referenced an identity with no created stream.
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),

    /// `create` was called for an identity that already has a stream.
    #[error("stream already exists: {0}")]
    StreamAlreadyExists(StreamId),

    /// Optimistic concurrency conflict: the caller's view of the stream is
    /// stale. Retryable after re-reading current state.
    #[error(
        "concurrency conflict on stream {stream_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The stream that had the conflict.
        stream_id: StreamId,
        /// The version the caller expected.
        expected: u64,
        /// The actual version found.
        actual: u64,
    },

    /// `create` was given a malformed seed history.
    #[error("invalid seed history for stream {stream_id}: {reason}")]
    InvalidCreate {
        /// The stream being created.
        stream_id: StreamId,
        /// Why the seed history was rejected.
        reason: String,
    },

    /// A backend/persistence failure (never produced by the in-memory
    /// reference backends).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Dispatcher construction errors. These indicate a programming defect in
/// the aggregate type definition: never transient, never retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler definition declared a malformed event type tag.
    #[error("invalid handler signature for '{aggregate_kind}': {reason}")]
    InvalidHandlerSignature {
        /// The aggregate kind whose registration is malformed.
        aggregate_kind: String,
        /// Why the handler definition was rejected.
        reason: String,
    },

    /// Two handlers were registered for the same event type within one
    /// aggregate type.
    #[error("duplicate handler for event type '{event_type}' on '{aggregate_kind}'")]
    DuplicateHandler {
        /// The aggregate kind carrying the duplicate.
        aggregate_kind: String,
        /// The event type tag registered twice.
        event_type: String,
    },

    /// `build` was called twice on the same strict-mode dispatcher.
    #[error("dispatcher for '{aggregate_kind}' is already initialized")]
    AlreadyInitialized {
        /// The aggregate kind whose dispatcher was already built.
        aggregate_kind: String,
    },
}

/// An event could not be applied during reconstruction. Fatal for the load:
/// the aggregate must not be returned in a partially-replayed state.
#[derive(Debug, Error)]
#[error("replay failed at version {version} applying '{event_type}': {source}")]
pub struct ReplayError {
    /// The event type tag that failed to apply.
    pub event_type: String,
    /// The stream version of the failing event (0 for uncommitted events).
    pub version: u64,
    /// The underlying payload decode failure.
    #[source]
    pub source: serde_json::Error,
}

/// Top-level error surfaced by the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The identity is unknown to both the event store and the snapshot
    /// store.
    #[error("aggregate not found: {0}")]
    NotFound(StreamId),

    /// An event could not be applied during replay.
    #[error(transparent)]
    Replay(#[from] ReplayError),

    /// Dispatcher construction failed for the aggregate type.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A store operation failed (including concurrency conflicts, which are
    /// propagated unchanged — retry policy belongs to the caller).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serializing an event or snapshot state failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// Whether this error is a retryable optimistic-concurrency conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(StoreError::ConcurrencyConflict { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_names_versions() {
        let err = StoreError::ConcurrencyConflict {
            stream_id: StreamId::new("A"),
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "concurrency conflict on stream A: expected version 1, found 3"
        );
    }

    #[test]
    fn test_repository_error_classifies_conflicts() {
        let conflict = RepositoryError::Store(StoreError::ConcurrencyConflict {
            stream_id: StreamId::new("A"),
            expected: 0,
            actual: 1,
        });
        let missing = RepositoryError::NotFound(StreamId::new("ghost"));

        assert!(conflict.is_conflict());
        assert!(!missing.is_conflict());
    }
}
