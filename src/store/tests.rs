// Error Store Tests - Project Vigil

use super::*;
use crate::types::ErrorContext;

fn record(fingerprint: &str, message: &str) -> ErrorRecord {
    ErrorRecord::new(
        Severity::Error,
        Category::Unknown,
        message,
        "TestError",
        "",
        ErrorContext::new(),
        fingerprint.to_string(),
    )
}

#[tokio::test]
async fn test_add_aggregates_by_fingerprint() {
    let store = ErrorStore::new(StoreConfig::default());

    let first = store.add(record("fp-1", "boom")).await;
    let second = store.add(record("fp-1", "boom")).await;
    let third = store.add(record("fp-1", "boom")).await;

    // Same canonical record, stable identity, count tracks occurrences
    assert_eq!(first.id, second.id);
    assert_eq!(second.id, third.id);
    assert_eq!(third.count, 3);
    assert_eq!(store.record_count().await, 1);
    assert_eq!(store.occurrence_count().await, 3);
}

#[tokio::test]
async fn test_add_distinct_fingerprints() {
    let store = ErrorStore::new(StoreConfig::default());

    store.add(record("fp-1", "a")).await;
    store.add(record("fp-2", "b")).await;

    assert_eq!(store.record_count().await, 2);
}

#[tokio::test]
async fn test_eviction_bound() {
    let config = StoreConfig {
        max_records: 20,
        max_occurrences: 1_000,
    };
    let store = ErrorStore::new(config);

    for i in 0..50 {
        store.add(record(&format!("fp-{i}"), "x")).await;
        // Never exceeds capacity by more than the pending insertion
        assert!(store.record_count().await <= 21);
    }
}

#[tokio::test]
async fn test_eviction_removes_oldest_by_last_seen() {
    let config = StoreConfig {
        max_records: 10,
        max_occurrences: 1_000,
    };
    let store = ErrorStore::new(config);

    for i in 0..10 {
        store.add(record(&format!("fp-{i}"), "x")).await;
    }
    // Touch fp-0 so it is no longer the oldest
    store.add(record("fp-0", "x")).await;
    // Overflow triggers eviction of the stalest 10%
    store.add(record("fp-new", "x")).await;

    let fingerprints: Vec<String> = store
        .records_snapshot()
        .await
        .into_iter()
        .map(|r| r.fingerprint)
        .collect();
    assert!(fingerprints.contains(&"fp-0".to_string()));
    assert!(!fingerprints.contains(&"fp-1".to_string()));
}

#[tokio::test]
async fn test_occurrence_log_is_bounded() {
    let config = StoreConfig {
        max_records: 100,
        max_occurrences: 10,
    };
    let store = ErrorStore::new(config);

    for _ in 0..25 {
        store.add(record("fp-1", "x")).await;
    }

    assert_eq!(store.occurrence_count().await, 10);
    // Aggregated count still reflects every occurrence
    let records = store.records_snapshot().await;
    assert_eq!(records[0].count, 25);
}

#[tokio::test]
async fn test_top_errors_ordering() {
    let store = ErrorStore::new(StoreConfig::default());

    for _ in 0..5 {
        store.add(record("fp-busy", "busy")).await;
    }
    store.add(record("fp-quiet", "quiet")).await;
    for _ in 0..3 {
        store.add(record("fp-mid", "mid")).await;
    }

    let top = store.top_errors(2).await;
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].fingerprint, "fp-busy");
    assert_eq!(top[0].count, 5);
    assert_eq!(top[1].fingerprint, "fp-mid");
}

#[tokio::test]
async fn test_get_by_id_and_resolve() {
    let store = ErrorStore::new(StoreConfig::default());

    let added = store.add(record("fp-1", "boom")).await;

    let found = store.get_by_id(added.id).await;
    assert!(found.is_some());

    assert!(store.resolve(added.id, "restarted worker").await);
    let resolved = store.get_by_id(added.id).await.unwrap();
    assert!(resolved.resolved);
    assert_eq!(resolved.resolution_notes.as_deref(), Some("restarted worker"));

    // Unknown ids report false rather than erroring
    assert!(!store.resolve(Uuid::new_v4(), "n/a").await);
    assert!(store.get_by_id(Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn test_occurrences_since() {
    let store = ErrorStore::new(StoreConfig::default());

    for _ in 0..4 {
        store.add(record("fp-1", "x")).await;
    }

    let past = Utc::now() - chrono::Duration::minutes(10);
    assert_eq!(store.occurrences_since(past).await, 4);

    let future = Utc::now() + chrono::Duration::minutes(10);
    assert_eq!(store.occurrences_since(future).await, 0);
}

#[tokio::test]
async fn test_occurrences_since_tolerates_unordered_log() {
    let store = ErrorStore::new(StoreConfig::default());

    store.add(record("fp-new", "x")).await;
    // An entry whose timestamp predates its log position
    let mut stale = record("fp-old", "x");
    stale.timestamp = Utc::now() - chrono::Duration::hours(2);
    store.add(stale).await;
    store.add(record("fp-new", "x")).await;

    let cutoff = Utc::now() - chrono::Duration::minutes(10);
    assert_eq!(store.occurrences_since(cutoff).await, 2);
}

#[tokio::test]
async fn test_recent_errors_filters_by_last_seen() {
    let store = ErrorStore::new(StoreConfig::default());
    store.add(record("fp-1", "x")).await;

    let hour_ago = Utc::now() - chrono::Duration::hours(1);
    assert_eq!(store.recent_errors(hour_ago).await.len(), 1);

    let future = Utc::now() + chrono::Duration::hours(1);
    assert!(store.recent_errors(future).await.is_empty());
}
