//! Integration tests for `MemoryEventStore`.

use std::sync::Arc;

use chronicle_core::error::StoreError;
use chronicle_core::event::{PendingEvent, StreamId, VersionedEvent};
use chronicle_core::store::EventStore;
use chronicle_store::MemoryEventStore;
use chronicle_test_support::FixedClock;

fn pending(event_type: &str) -> PendingEvent {
    PendingEvent {
        event_type: event_type.to_owned(),
        payload: serde_json::json!({}),
    }
}

fn store() -> MemoryEventStore {
    MemoryEventStore::with_clock(Arc::new(FixedClock::default_instant()))
}

#[tokio::test]
async fn test_round_trip_appends_and_loads_in_version_order() {
    // Arrange
    let store = store();
    let id = StreamId::new("A");
    store.create(id.clone(), 0, Vec::new()).await.unwrap();

    // Act
    let v1 = store.append(&id, 0, vec![pending("e1")]).await.unwrap();
    let v3 = store
        .append(&id, 1, vec![pending("e2"), pending("e3")])
        .await
        .unwrap();
    let events = store.load_all(&id).await.unwrap();

    // Assert
    assert_eq!(v1, 1);
    assert_eq!(v3, 3);
    let loaded: Vec<(String, u64)> = events
        .iter()
        .map(|e| (e.event_type.clone(), e.version))
        .collect();
    assert_eq!(
        loaded,
        vec![
            ("e1".to_owned(), 1),
            ("e2".to_owned(), 2),
            ("e3".to_owned(), 3)
        ]
    );
}

#[tokio::test]
async fn test_stale_expected_version_fails_and_never_mutates_the_stream() {
    // Arrange
    let store = store();
    let id = StreamId::new("A");
    store.create(id.clone(), 0, Vec::new()).await.unwrap();
    store
        .append(&id, 0, vec![pending("e1")])
        .await
        .unwrap();
    store
        .append(&id, 1, vec![pending("e2"), pending("e3")])
        .await
        .unwrap();

    // Act
    let result = store.append(&id, 1, vec![pending("e4")]).await;

    // Assert
    match result.unwrap_err() {
        StoreError::ConcurrencyConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 3);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    let events = store.load_all(&id).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(store.current_version(&id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_create_twice_fails_with_stream_already_exists() {
    // Arrange
    let store = store();
    let id = StreamId::new("A");
    store.create(id.clone(), 0, Vec::new()).await.unwrap();

    // Act
    let result = store.create(id.clone(), 0, Vec::new()).await;

    // Assert
    assert!(matches!(result, Err(StoreError::StreamAlreadyExists(_))));
}

#[tokio::test]
async fn test_operations_on_unknown_identity_fail_with_stream_not_found() {
    // Arrange
    let store = store();
    let ghost = StreamId::new("ghost");

    // Act / Assert
    assert!(matches!(
        store.append(&ghost, 0, vec![pending("e1")]).await,
        Err(StoreError::StreamNotFound(_))
    ));
    assert!(matches!(
        store.current_version(&ghost).await,
        Err(StoreError::StreamNotFound(_))
    ));
    assert!(matches!(
        store.load_all(&ghost).await,
        Err(StoreError::StreamNotFound(_))
    ));
    assert!(matches!(
        store.load_after(&ghost, 0).await,
        Err(StoreError::StreamNotFound(_))
    ));
}

#[tokio::test]
async fn test_range_loads_honor_inclusive_and_exclusive_bounds() {
    // Arrange
    let store = store();
    let id = StreamId::new("A");
    store.create(id.clone(), 0, Vec::new()).await.unwrap();
    store
        .append(
            &id,
            0,
            vec![pending("e1"), pending("e2"), pending("e3"), pending("e4")],
        )
        .await
        .unwrap();

    // Act
    let up_to = store.load_up_to(&id, 2).await.unwrap();
    let after = store.load_after(&id, 2).await.unwrap();

    // Assert
    assert_eq!(
        up_to.iter().map(|e| e.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(
        after.iter().map(|e| e.version).collect::<Vec<_>>(),
        vec![3, 4]
    );
}

#[tokio::test]
async fn test_create_accepts_versioned_seed_history() {
    // Arrange
    let store = store();
    let id = StreamId::new("imported");
    let now = FixedClock::default_instant().0;
    let seed = vec![
        VersionedEvent {
            event_type: "e1".to_owned(),
            payload: serde_json::json!({}),
            version: 1,
            recorded_at: now,
        },
        VersionedEvent {
            event_type: "e2".to_owned(),
            payload: serde_json::json!({}),
            version: 2,
            recorded_at: now,
        },
    ];

    // Act
    store.create(id.clone(), 2, seed).await.unwrap();
    let version = store.append(&id, 2, vec![pending("e3")]).await.unwrap();

    // Assert
    assert_eq!(version, 3);
    assert_eq!(
        store
            .load_all(&id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.version)
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn test_create_rejects_malformed_seed_history() {
    // Arrange
    let store = store();
    let now = FixedClock::default_instant().0;
    let seed = vec![VersionedEvent {
        event_type: "e1".to_owned(),
        payload: serde_json::json!({}),
        version: 1,
        recorded_at: now,
    }];

    // Act
    let result = store.create(StreamId::new("bad"), 9, seed).await;

    // Assert
    assert!(matches!(result, Err(StoreError::InvalidCreate { .. })));
    assert_eq!(store.stream_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_retrying_writers_produce_gapless_versions() {
    // Arrange
    let store = Arc::new(store());
    let id = StreamId::new("contended");
    store.create(id.clone(), 0, Vec::new()).await.unwrap();

    // Act: each writer retries on conflict, as the caller layer would.
    let mut tasks = Vec::new();
    for writer in 0..8 {
        let store = Arc::clone(&store);
        let id = id.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                let current = store.current_version(&id).await.unwrap();
                let event = PendingEvent {
                    event_type: format!("writer-{writer}"),
                    payload: serde_json::json!({}),
                };
                match store.append(&id, current, vec![event]).await {
                    Ok(_) => break,
                    Err(StoreError::ConcurrencyConflict { .. }) => {}
                    Err(other) => panic!("unexpected error: {other:?}"),
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // Assert: strictly increasing versions with no gaps.
    let events = store.load_all(&id).await.unwrap();
    let versions: Vec<u64> = events.iter().map(|e| e.version).collect();
    assert_eq!(versions, (1..=8).collect::<Vec<_>>());
    assert_eq!(store.current_version(&id).await.unwrap(), 8);
}

#[tokio::test]
async fn test_different_identities_do_not_interfere() {
    // Arrange
    let store = store();
    let a = StreamId::new("A");
    let b = StreamId::new("B");
    store.create(a.clone(), 0, Vec::new()).await.unwrap();
    store.create(b.clone(), 0, Vec::new()).await.unwrap();

    // Act
    store.append(&a, 0, vec![pending("e1")]).await.unwrap();
    store
        .append(&b, 0, vec![pending("x1"), pending("x2")])
        .await
        .unwrap();

    // Assert
    assert_eq!(store.current_version(&a).await.unwrap(), 1);
    assert_eq!(store.current_version(&b).await.unwrap(), 2);
}
