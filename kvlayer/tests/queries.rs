//! End-to-end query behavior against the in-memory backend.

use std::collections::HashSet;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use kvlayer::{memory::InMemoryStore, prelude::*};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

async fn connect(backend: &InMemoryStore) -> Store<InMemoryStore> {
    Store::connect(backend.clone(), StoreOptions::default())
        .await
        .unwrap()
}

async fn seed(store: &Store<InMemoryStore>, table: &str, documents: Vec<Value>) {
    for document in documents {
        let result = store.from_table(table).insert(doc(document)).await;
        assert!(!result.has_error(), "{:?}", result.error_message());
    }
}

fn ids(result: &QueryResult) -> Vec<&str> {
    result
        .data()
        .iter()
        .map(|document| document["id"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn deriving_builders_leaves_the_original_untouched() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1", "x": 1 }), json!({ "id": "2", "x": 2 })]).await;

    let base = store.from_table("t");
    let before = base.execute().await;

    let derived = base.select("id").eq("x", 1).order("x");
    let narrowed = derived.execute().await;
    let after = base.execute().await;

    assert_eq!(base.query(), &Query::new("t"));
    assert_eq!(narrowed.data(), &[doc(json!({ "id": "1" }))]);
    assert_eq!(before.len(), 2);
    assert_eq!(after.len(), 2);
    assert!(after.data().iter().all(|document| document.contains_key("x")));
}

#[tokio::test]
async fn insert_then_single_returns_generated_id() {
    let backend = InMemoryStore::new();
    let store = connect(&backend).await;

    let inserted = store.from_table("t").insert(doc(json!({ "name": "a" }))).await;
    let found = store.from_table("t").single().await;

    assert!(!inserted.has_error());
    assert_eq!(found.len(), 1);

    let document = found.first().unwrap();
    let id = document["id"].as_str().unwrap();
    assert_eq!(document["name"], "a");
    assert_eq!(id.len(), 36);
    assert_eq!(document.len(), 2);
    assert_eq!(inserted.first(), Some(document));
    assert_eq!(backend.raw_keys().await, vec![format!("t:{id}")]);
}

#[tokio::test]
async fn filters_are_combined_with_and() {
    let store = connect(&InMemoryStore::new()).await;
    seed(
        &store,
        "t",
        vec![json!({ "id": "1", "x": 1, "y": 1 }), json!({ "id": "2", "x": 1, "y": 2 })],
    )
    .await;

    let result = store.from_table("t").eq("x", 1).eq("y", 2).execute().await;

    assert_eq!(ids(&result), vec!["2"]);
}

#[tokio::test]
async fn numeric_filters_compare_by_value() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1", "score": 1.0 }), json!({ "id": "2", "score": 2 })]).await;

    let result = store.from_table("t").eq("score", 1).execute().await;

    assert_eq!(ids(&result), vec!["1"]);
}

#[tokio::test]
async fn null_filter_matches_only_present_nulls() {
    let store = connect(&InMemoryStore::new()).await;
    seed(
        &store,
        "t",
        vec![json!({ "id": "1", "deleted_at": null }), json!({ "id": "2" })],
    )
    .await;

    let result = store.from_table("t").eq("deleted_at", Value::Null).execute().await;

    assert_eq!(ids(&result), vec!["1"]);
}

#[tokio::test]
async fn missing_order_field_sorts_first_ascending_last_descending() {
    let store = connect(&InMemoryStore::new()).await;
    seed(
        &store,
        "t",
        vec![
            json!({ "id": "1", "n": 2 }),
            json!({ "id": "2" }),
            json!({ "id": "3", "n": 1 }),
        ],
    )
    .await;

    for _ in 0..5 {
        let ascending = store.from_table("t").order("n").execute().await;
        let descending = store
            .from_table("t")
            .order_by("n", SortDirection::Desc)
            .execute()
            .await;

        assert_eq!(ids(&ascending), vec!["2", "3", "1"]);
        assert_eq!(ids(&descending), vec!["1", "3", "2"]);
    }
}

#[tokio::test]
async fn update_merges_patch_into_matches() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1", "a": 1, "b": 1 }), json!({ "id": "2", "b": 1 })]).await;

    let updated = store
        .from_table("t")
        .eq("id", "1")
        .update(doc(json!({ "b": 2, "c": 3 })))
        .await;
    let found = store.from_table("t").eq("id", "1").single().await;
    let untouched = store.from_table("t").eq("id", "2").single().await;

    assert_eq!(updated.len(), 1);
    assert_eq!(found.data(), &[doc(json!({ "id": "1", "a": 1, "b": 2, "c": 3 }))]);
    assert_eq!(untouched.data(), &[doc(json!({ "id": "2", "b": 1 }))]);
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1" })]).await;

    let result = store.from_table("t").update(Document::new()).await;

    assert!(result.has_error());
    assert!(result.is_empty());
    assert_eq!(result.error_message(), Some("No update data provided"));
}

#[tokio::test]
async fn unfiltered_delete_clears_only_that_table() {
    let backend = InMemoryStore::new();
    let store = connect(&backend).await;
    seed(&store, "t", vec![json!({ "id": "1" }), json!({ "id": "2" })]).await;
    seed(&store, "other", vec![json!({ "id": "1" })]).await;

    let deleted = store.from_table("t").delete().await;
    let remaining = store.from_table("t").execute().await;

    assert_eq!(deleted.len(), 2);
    assert!(!remaining.has_error());
    assert!(remaining.is_empty());
    assert_eq!(backend.raw_keys().await, vec!["other:1".to_string()]);
}

#[tokio::test]
async fn repeated_delete_is_an_empty_success() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1" })]).await;

    let first = store.from_table("t").eq("id", "1").delete().await;
    let second = store.from_table("t").eq("id", "1").delete().await;

    assert_eq!(ids(&first), vec!["1"]);
    assert!(!second.has_error());
    assert!(second.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_get_distinct_keys() {
    let backend = InMemoryStore::new();
    let store = connect(&backend).await;
    let table = store.from_table("t");

    let handles = (0..200)
        .map(|n| table.insert(doc(json!({ "n": n }))))
        .collect::<Vec<_>>();
    let results = join_all(handles).await;

    let generated: HashSet<String> = results
        .iter()
        .map(|result| {
            assert!(!result.has_error(), "{:?}", result.error_message());
            result.first().unwrap()["id"].as_str().unwrap().to_string()
        })
        .collect();

    assert_eq!(generated.len(), 200);
    assert_eq!(backend.raw_keys().await.len(), 200);
}

#[tokio::test]
async fn projection_keeps_requested_order_and_drops_absent_fields() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "t", vec![json!({ "id": "1", "name": "a", "age": 3 })]).await;

    let result = store.from_table("t").select("name, missing, id").execute().await;
    let document = result.first().unwrap();

    assert_eq!(document.keys().collect::<Vec<_>>(), vec!["name", "id"]);
    assert_eq!(
        store.from_table("t").select(" * ").single().await.first().map(Document::len),
        Some(3)
    );
}

#[tokio::test]
async fn single_ignores_ordering() {
    let store = connect(&InMemoryStore::new()).await;
    seed(
        &store,
        "t",
        vec![
            json!({ "id": "1", "n": 1, "k": "a" }),
            json!({ "id": "2", "n": 2, "k": "b" }),
            json!({ "id": "3", "n": 0, "k": "a" }),
        ],
    )
    .await;

    let ordered = store.from_table("t").eq("k", "b").order("n").single().await;
    let unordered = store.from_table("t").eq("k", "b").single().await;
    let missing = store.from_table("t").eq("k", "c").order("n").single().await;

    assert_eq!(ids(&ordered), vec!["2"]);
    assert_eq!(ordered.data(), unordered.data());
    assert!(missing.is_empty() && !missing.has_error());
}

#[tokio::test]
async fn explicit_ids_key_the_document_and_overwrite() {
    let backend = InMemoryStore::new();
    let store = connect(&backend).await;

    seed(&store, "t", vec![json!({ "id": 7, "v": "old" })]).await;
    seed(&store, "t", vec![json!({ "id": 7, "v": "new" })]).await;

    assert_eq!(backend.raw_keys().await, vec!["t:7".to_string()]);
    assert_eq!(
        store.get_by_key("t:7").await.data(),
        &[doc(json!({ "id": 7, "v": "new" }))]
    );
}

#[tokio::test]
async fn table_names_are_not_glob_patterns() {
    let store = connect(&InMemoryStore::new()).await;
    seed(&store, "a*", vec![json!({ "id": "1" })]).await;
    seed(&store, "ab", vec![json!({ "id": "2" })]).await;

    let result = store.from_table("a*").execute().await;

    assert_eq!(ids(&result), vec!["1"]);
}

#[tokio::test]
async fn get_by_key_reads_one_document() {
    let backend = InMemoryStore::new();
    let store = connect(&backend).await;
    seed(&store, "t", vec![json!({ "id": "1", "v": true })]).await;
    backend.raw_set("t:broken", "{not json").await;

    let hit = store.get_by_key("t:1").await;
    let miss = store.get_by_key("t:2").await;
    let broken = store.get_by_key("t:broken").await;

    assert_eq!(hit.data(), &[doc(json!({ "id": "1", "v": true }))]);
    assert!(!miss.has_error());
    assert!(miss.is_empty());
    assert!(broken.has_error());
}

#[tokio::test]
async fn typed_values_round_trip() {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: String,
        name: String,
        age: u32,
    }

    let store = connect(&InMemoryStore::new()).await;
    let users = store.from_table("users");
    let alice = User { id: "alice".into(), name: "Alice".into(), age: 30 };

    users.insert_value(&alice).await;
    let found = users.eq("name", "Alice").execute().await;

    assert_eq!(found.deserialize::<User>().unwrap(), vec![alice]);
    assert!(users.insert_value(&vec![1, 2]).await.has_error());
}
