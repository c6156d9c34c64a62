//! Repository orchestration: snapshot-seeded loads and optimistic stores.
//!
//! `Repository` wires the event store, the snapshot store, and the aggregate
//! runtime together at the caller's granularity: `find` reconstructs an
//! aggregate (snapshot first, then the events recorded after it), `store`
//! appends its buffered changes under the version it was loaded at.

use std::num::NonZeroU64;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::aggregate::{Aggregate, EventSourced};
use crate::clock::Clock;
use crate::dispatch::DispatcherProvider;
use crate::error::{RepositoryError, StoreError};
use crate::event::StreamId;
use crate::store::{EventStore, Snapshot, SnapshotStore};

/// When the repository offers a snapshot after a successful store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    /// Never snapshot; every load replays the full history.
    Never,
    /// Snapshot whenever a store crosses a multiple of `n` versions.
    EveryN(NonZeroU64),
}

impl SnapshotPolicy {
    fn due(self, previous_version: u64, new_version: u64) -> bool {
        match self {
            Self::Never => false,
            Self::EveryN(n) => previous_version / n.get() < new_version / n.get(),
        }
    }
}

/// Orchestrates event store, snapshot store, and aggregate reconstruction.
pub struct Repository<ES, SS> {
    event_store: Arc<ES>,
    snapshot_store: Arc<SS>,
    dispatchers: Arc<DispatcherProvider>,
    clock: Arc<dyn Clock>,
    snapshot_policy: SnapshotPolicy,
}

impl<ES, SS> Repository<ES, SS>
where
    ES: EventStore,
    SS: SnapshotStore,
{
    /// Creates a repository with no snapshot policy and a default dispatcher
    /// cache.
    pub fn new(event_store: Arc<ES>, snapshot_store: Arc<SS>, clock: Arc<dyn Clock>) -> Self {
        Self {
            event_store,
            snapshot_store,
            dispatchers: Arc::new(DispatcherProvider::default()),
            clock,
            snapshot_policy: SnapshotPolicy::Never,
        }
    }

    /// Sets the snapshot policy.
    #[must_use]
    pub fn with_snapshot_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }

    /// Replaces the dispatcher provider (to share one cache across
    /// repositories, or to bound it differently).
    #[must_use]
    pub fn with_dispatcher_provider(mut self, dispatchers: Arc<DispatcherProvider>) -> Self {
        self.dispatchers = dispatchers;
        self
    }

    /// Creates a fresh, historyless aggregate for `stream_id`.
    ///
    /// # Errors
    ///
    /// Returns a dispatch error if `T`'s handler registration is malformed.
    pub fn fresh<T>(&self, stream_id: StreamId) -> Result<Aggregate<T>, RepositoryError>
    where
        T: EventSourced,
    {
        let dispatcher = self.dispatchers.dispatcher_for::<T>()?;
        Ok(Aggregate::fresh(stream_id, dispatcher))
    }

    /// Reconstructs the aggregate for `stream_id`.
    ///
    /// The latest snapshot (if any) seeds the entity state and version; only
    /// events recorded strictly after it are replayed. Without a snapshot,
    /// replay starts from the beginning of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the identity is unknown to
    /// both stores, [`RepositoryError::Replay`] if an event cannot be
    /// applied, or the underlying store/dispatch error.
    pub async fn find<T>(&self, stream_id: &StreamId) -> Result<Aggregate<T>, RepositoryError>
    where
        T: EventSourced + DeserializeOwned,
    {
        let dispatcher = self.dispatchers.dispatcher_for::<T>()?;
        let snapshot = self.snapshot_store.find_latest(stream_id).await?;

        let (mut aggregate, events, target_version) = match snapshot {
            Some(snapshot) => {
                tracing::debug!(
                    stream_id = %stream_id,
                    snapshot_version = snapshot.version,
                    "seeding aggregate from snapshot"
                );
                let entity: T = serde_json::from_value(snapshot.state)?;
                let version = snapshot.version;
                let aggregate =
                    Aggregate::from_state(stream_id.clone(), entity, version, dispatcher);
                // The stream may legitimately be absent when a snapshot
                // exists (e.g. a backend that compacts fully-snapshotted
                // streams); that just means nothing newer to replay.
                let (events, target_version) =
                    match self.event_store.current_version(stream_id).await {
                        Ok(current) => {
                            let events = self.event_store.load_after(stream_id, version).await?;
                            (events, current)
                        }
                        Err(StoreError::StreamNotFound(_)) => (Vec::new(), version),
                        Err(err) => return Err(err.into()),
                    };
                (aggregate, events, target_version)
            }
            None => {
                // The stream version is authoritative, not the last event:
                // a stream created with an empty seed at a non-zero version
                // holds no events at all.
                let current = match self.event_store.current_version(stream_id).await {
                    Ok(current) => current,
                    Err(StoreError::StreamNotFound(_)) => {
                        return Err(RepositoryError::NotFound(stream_id.clone()));
                    }
                    Err(err) => return Err(err.into()),
                };
                let events = self.event_store.load_all(stream_id).await?;
                let aggregate = Aggregate::fresh(stream_id.clone(), dispatcher);
                (aggregate, events, current)
            }
        };

        aggregate.replay(&events, target_version)?;
        Ok(aggregate)
    }

    /// Persists the aggregate's buffered events under its known version.
    ///
    /// A concurrency conflict from the event store propagates unchanged; the
    /// repository never retries — only the caller knows how to re-derive its
    /// intended change against fresh state. Storing an aggregate with an
    /// empty buffer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConcurrencyConflict`] (wrapped) if another
    /// writer advanced the stream, [`StoreError::StreamNotFound`] for a
    /// stream that was never created, or a serialization error from the
    /// snapshot policy.
    pub async fn store<T>(&self, aggregate: &mut Aggregate<T>) -> Result<(), RepositoryError>
    where
        T: EventSourced + Serialize,
    {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(());
        }

        let expected_version = aggregate.version();
        let events = aggregate.uncommitted_events().to_vec();
        let event_count = events.len();
        let new_version = self
            .event_store
            .append(aggregate.stream_id(), expected_version, events)
            .await?;
        aggregate.mark_committed(new_version);
        tracing::debug!(
            stream_id = %aggregate.stream_id(),
            event_count,
            new_version,
            "aggregate stored"
        );

        self.offer_snapshot(aggregate, expected_version, new_version)
            .await?;
        Ok(())
    }

    /// Creates the stream for a brand-new aggregate, then persists its
    /// buffered events.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StreamAlreadyExists`] (wrapped) if another
    /// writer created the stream first.
    pub async fn store_new<T>(&self, aggregate: &mut Aggregate<T>) -> Result<(), RepositoryError>
    where
        T: EventSourced + Serialize,
    {
        self.event_store
            .create(aggregate.stream_id().clone(), 0, Vec::new())
            .await?;
        self.store(aggregate).await
    }

    /// Applies the snapshot policy after a successful store. Snapshot
    /// failures never fail the store: the events are already durable and a
    /// snapshot is only an optimization.
    async fn offer_snapshot<T>(
        &self,
        aggregate: &Aggregate<T>,
        previous_version: u64,
        new_version: u64,
    ) -> Result<(), RepositoryError>
    where
        T: EventSourced + Serialize,
    {
        if !self.snapshot_policy.due(previous_version, new_version) {
            return Ok(());
        }

        let snapshot = Snapshot {
            stream_id: aggregate.stream_id().clone(),
            version: new_version,
            state: serde_json::to_value(aggregate.entity())?,
            taken_at: self.clock.now(),
        };
        match self.snapshot_store.store(snapshot).await {
            Ok(()) => {
                tracing::debug!(
                    stream_id = %aggregate.stream_id(),
                    version = new_version,
                    "snapshot stored"
                );
            }
            Err(StoreError::ConcurrencyConflict { actual, .. }) => {
                tracing::debug!(
                    stream_id = %aggregate.stream_id(),
                    offered = new_version,
                    stored = actual,
                    "newer snapshot already stored; keeping it"
                );
            }
            Err(err) => {
                tracing::warn!(
                    stream_id = %aggregate.stream_id(),
                    error = %err,
                    "snapshot store failed; continuing without snapshot"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_n_policy_fires_on_multiple_crossings() {
        let policy = SnapshotPolicy::EveryN(NonZeroU64::new(3).unwrap());

        assert!(!policy.due(0, 2));
        assert!(policy.due(2, 3));
        assert!(policy.due(2, 7));
        assert!(!policy.due(3, 5));
        assert!(policy.due(5, 6));
    }

    #[test]
    fn test_never_policy_never_fires() {
        assert!(!SnapshotPolicy::Never.due(0, 1_000));
    }
}
