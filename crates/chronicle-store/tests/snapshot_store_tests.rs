//! Integration tests for `MemorySnapshotStore`.

use chronicle_core::error::StoreError;
use chronicle_core::event::StreamId;
use chronicle_core::store::{Snapshot, SnapshotStore};
use chronicle_store::MemorySnapshotStore;
use chronicle_test_support::FixedClock;

fn snapshot(id: &str, version: u64, state: serde_json::Value) -> Snapshot {
    Snapshot {
        stream_id: StreamId::new(id),
        version,
        state,
        taken_at: FixedClock::default_instant().0,
    }
}

#[tokio::test]
async fn test_find_latest_returns_none_for_unknown_identity() {
    // Arrange
    let store = MemorySnapshotStore::new();

    // Act
    let result = store.find_latest(&StreamId::new("ghost")).await.unwrap();

    // Assert
    assert!(result.is_none());
}

#[tokio::test]
async fn test_newer_snapshot_supersedes_older() {
    // Arrange
    let store = MemorySnapshotStore::new();
    store
        .store(snapshot("A", 3, serde_json::json!({"n": 3})))
        .await
        .unwrap();

    // Act
    store
        .store(snapshot("A", 6, serde_json::json!({"n": 6})))
        .await
        .unwrap();

    // Assert
    let latest = store
        .find_latest(&StreamId::new("A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 6);
    assert_eq!(latest.state, serde_json::json!({"n": 6}));
    assert_eq!(store.snapshot_count(), 1);
}

#[tokio::test]
async fn test_older_snapshot_is_rejected_and_never_replaces_the_stored_one() {
    // Arrange
    let store = MemorySnapshotStore::new();
    store
        .store(snapshot("A", 6, serde_json::json!({"n": 6})))
        .await
        .unwrap();

    // Act
    let result = store.store(snapshot("A", 3, serde_json::json!({"n": 3}))).await;

    // Assert
    match result.unwrap_err() {
        StoreError::ConcurrencyConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, 3);
            assert_eq!(actual, 6);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    let latest = store
        .find_latest(&StreamId::new("A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 6);
}

#[tokio::test]
async fn test_equal_version_is_an_idempotent_overwrite() {
    // Arrange
    let store = MemorySnapshotStore::new();
    store
        .store(snapshot("A", 6, serde_json::json!({"n": 6})))
        .await
        .unwrap();

    // Act
    store
        .store(snapshot("A", 6, serde_json::json!({"n": "rewritten"})))
        .await
        .unwrap();

    // Assert
    let latest = store
        .find_latest(&StreamId::new("A"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.version, 6);
    assert_eq!(latest.state, serde_json::json!({"n": "rewritten"}));
}

#[tokio::test]
async fn test_snapshots_are_kept_per_identity() {
    // Arrange
    let store = MemorySnapshotStore::new();

    // Act
    store
        .store(snapshot("A", 2, serde_json::json!({})))
        .await
        .unwrap();
    store
        .store(snapshot("B", 9, serde_json::json!({})))
        .await
        .unwrap();

    // Assert
    assert_eq!(store.snapshot_count(), 2);
    assert_eq!(
        store
            .find_latest(&StreamId::new("A"))
            .await
            .unwrap()
            .unwrap()
            .version,
        2
    );
    assert_eq!(
        store
            .find_latest(&StreamId::new("B"))
            .await
            .unwrap()
            .unwrap()
            .version,
        9
    );
}
