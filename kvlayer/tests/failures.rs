//! Failure paths: unreadable data, unavailable stores and pool limits.

use serde_json::{Value, json};

use kvlayer::{memory::InMemoryStore, prelude::*};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn small_pool(max_total: usize) -> StoreOptions {
    StoreOptions {
        pool: PoolConfig {
            max_total,
            max_idle: max_total,
            min_idle: 0,
            acquire_timeout_ms: 50,
            ..PoolConfig::default()
        },
        workers: 4,
    }
}

#[tokio::test]
async fn undecodable_values_are_skipped_during_scans() {
    let backend = InMemoryStore::new();
    backend.raw_set("t:good", r#"{"id":"good"}"#).await;
    backend.raw_set("t:garbage", "not json").await;
    backend.raw_set("t:array", "[1,2,3]").await;

    let store = Store::connect(backend, StoreOptions::default()).await.unwrap();
    let result = store.from_table("t").execute().await;

    assert!(!result.has_error());
    assert_eq!(result.data(), &[doc(json!({ "id": "good" }))]);
}

#[tokio::test]
async fn exhausted_pool_becomes_an_error_result() {
    let store = Store::connect(InMemoryStore::new(), small_pool(1)).await.unwrap();

    let held = store.pool().acquire().await.unwrap();
    let starved = store.from_table("t").execute().await;
    held.release().await;
    let recovered = store.from_table("t").execute().await;

    assert!(starved.has_error());
    assert!(starved.is_empty());
    assert!(starved.error_message().unwrap().contains("exhausted"));
    assert!(!recovered.has_error());
}

#[tokio::test]
async fn broken_idle_connections_are_replaced() {
    let backend = InMemoryStore::new();
    let store = Store::connect(backend.clone(), StoreOptions::default()).await.unwrap();
    let warmed = backend.connections_opened();

    backend.break_connections();
    let result = store.from_table("t").insert(doc(json!({ "id": "1" }))).await;

    assert!(!result.has_error(), "{:?}", result.error_message());
    assert!(backend.connections_opened() > warmed);
}

#[tokio::test]
async fn unreachable_store_fails_every_operation() {
    let backend = InMemoryStore::new();
    let store = Store::connect(backend.clone(), StoreOptions::default()).await.unwrap();
    backend.set_available(false);

    let read = store.from_table("t").execute().await;
    let write = store.from_table("t").insert(doc(json!({ "a": 1 }))).await;

    assert!(read.error_message().unwrap().starts_with("Store unavailable"));
    assert!(write.has_error());

    backend.set_available(true);
    assert!(!store.from_table("t").execute().await.has_error());
}

#[tokio::test]
async fn failed_update_reports_progress() {
    let backend = InMemoryStore::new();
    let store = Store::connect(backend.clone(), StoreOptions::default()).await.unwrap();
    for id in ["1", "2", "3"] {
        store.from_table("t").insert(doc(json!({ "id": id, "v": 0 }))).await;
    }

    backend.fail_writes_after(1);
    let result = store.from_table("t").update(doc(json!({ "v": 1 }))).await;
    backend.allow_writes();

    let message = result.error_message().unwrap();
    assert!(message.starts_with("update failed after 1 of 3 records"), "{message}");

    let updated = store.from_table("t").eq("v", 1).execute().await;
    assert_eq!(updated.len(), 1);
}

#[tokio::test]
async fn failed_delete_reports_progress() {
    let backend = InMemoryStore::new();
    let store = Store::connect(backend.clone(), StoreOptions::default()).await.unwrap();
    for id in ["1", "2"] {
        store.from_table("t").insert(doc(json!({ "id": id }))).await;
    }

    backend.fail_writes_after(0);
    let result = store.from_table("t").delete().await;
    backend.allow_writes();

    assert!(result.error_message().unwrap().starts_with("delete failed after 0 of 2 records"));
    assert_eq!(backend.raw_keys().await.len(), 2);
}

#[tokio::test]
async fn closed_store_rejects_operations() {
    let store = Store::connect(InMemoryStore::new(), StoreOptions::default()).await.unwrap();

    store.close().await;
    let result = store.from_table("t").execute().await;

    assert!(result.has_error());
    assert_eq!(store.pool_status().await.idle, 0);
}

#[tokio::test]
async fn zero_workers_is_rejected() {
    let options = StoreOptions { workers: 0, ..StoreOptions::default() };

    let err = Store::connect(InMemoryStore::new(), options).await.unwrap_err();

    assert!(matches!(err, StoreError::Initialization(_)));
}
