//! In-memory key-value store implementation.
//!
//! This module provides a shared string map that behaves like a single Redis database for
//! the five commands the query layer uses, plus switches that make the store misbehave on
//! demand so failure paths can be exercised without a network.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use mea::rwlock::RwLock;
use tracing::debug;

use kvlayer_core::{
    backend::{ConnectionManager, KvConnection, ManagerBuilder},
    error::{StoreError, StoreResult},
};

use crate::glob::glob_match;

type KeyMap = HashMap<String, String>;

const UNLIMITED: usize = usize::MAX;

#[derive(Debug)]
struct Faults {
    available: AtomicBool,
    /// Writes still allowed before every write fails.
    write_budget: AtomicUsize,
    /// Connections opened before the current generation fail every command.
    generation: AtomicU64,
    opened: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            write_budget: AtomicUsize::new(UNLIMITED),
            generation: AtomicU64::new(0),
            opened: AtomicUsize::new(0),
        }
    }
}

/// Thread-safe in-memory key-value store.
///
/// `InMemoryStore` is the [`ConnectionManager`] for this backend. It is cloneable and all
/// clones share the same data, so a test can keep a clone to inspect or corrupt raw values
/// while a `Store` queries through another.
///
/// # Example
///
/// ```ignore
/// use kvlayer_memory::InMemoryStore;
/// use kvlayer::{Store, StoreOptions};
///
/// let backend = InMemoryStore::new();
/// backend.raw_set("users:1", r#"{"id":"1","name":"Ada"}"#).await;
///
/// let store = Store::connect(backend.clone(), StoreOptions::default()).await?;
/// let result = store.get_by_key("users:1").await;
/// assert_eq!(result.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    data: Arc<RwLock<KeyMap>>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Reads a raw value, bypassing connections and faults.
    pub async fn raw_get(&self, key: &str) -> Option<String> {
        self.data.read().await.get(key).cloned()
    }

    /// Writes a raw value, bypassing connections and faults.
    pub async fn raw_set(&self, key: &str, value: &str) {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    /// Lists every stored key, sorted.
    pub async fn raw_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Makes the store reachable or unreachable. While unreachable, connecting and every
    /// command fail with [`StoreError::StoreUnavailable`].
    pub fn set_available(&self, available: bool) {
        self.faults.available.store(available, Ordering::SeqCst);
    }

    /// Lets `writes` more `SET`/`DEL` commands succeed, then fails every later write.
    pub fn fail_writes_after(&self, writes: usize) {
        self.faults.write_budget.store(writes, Ordering::SeqCst);
    }

    /// Removes any write limit set by [`fail_writes_after`](Self::fail_writes_after).
    pub fn allow_writes(&self) {
        self.faults.write_budget.store(UNLIMITED, Ordering::SeqCst);
    }

    /// Invalidates every connection opened so far. New connections are unaffected.
    pub fn break_connections(&self) {
        self.faults.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of connections opened over the store's lifetime.
    pub fn connections_opened(&self) -> usize {
        self.faults.opened.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.faults.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::StoreUnavailable("in-memory store is offline".to_string()))
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryStore {
    type Connection = MemoryConnection;

    async fn connect(&self) -> StoreResult<MemoryConnection> {
        self.check_available()?;

        let opened = self.faults.opened.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(opened, "opened in-memory connection");

        Ok(MemoryConnection {
            store: self.clone(),
            generation: self.faults.generation.load(Ordering::SeqCst),
        })
    }
}

/// A connection to an [`InMemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: InMemoryStore,
    generation: u64,
}

impl MemoryConnection {
    fn check(&self) -> StoreResult<()> {
        self.store.check_available()?;

        if self.generation != self.store.faults.generation.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionInvalid("connection was reset".to_string()));
        }

        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        self.check()?;

        self.store
            .faults
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| match remaining {
                UNLIMITED => Some(UNLIMITED),
                0 => None,
                n => Some(n - 1),
            })
            .map(|_| ())
            .map_err(|_| StoreError::StoreUnavailable("write rejected".to_string()))
    }
}

#[async_trait]
impl KvConnection for MemoryConnection {
    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self.store.data.read().await.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.check_write()?;
        self.store
            .data
            .write()
            .await
            .insert(key.to_string(), value.to_string());

        Ok(())
    }

    async fn del(&mut self, key: &str) -> StoreResult<bool> {
        self.check_write()?;
        Ok(self.store.data.write().await.remove(key).is_some())
    }

    async fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        self.check()?;

        Ok(
            self.store
                .data
                .read()
                .await
                .keys()
                .filter(|key| glob_match(pattern, key))
                .cloned()
                .collect()
        )
    }

    async fn ping(&mut self) -> StoreResult<()> {
        self.check()
    }
}

/// Builder for creating [`InMemoryStore`] instances.
///
/// Seed entries are written before the store is handed out.
#[derive(Default, Debug)]
pub struct InMemoryStoreBuilder {
    seed: Vec<(String, String)>,
}

impl InMemoryStoreBuilder {
    /// Adds a raw entry to write into the new store.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.seed.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl ManagerBuilder for InMemoryStoreBuilder {
    type Manager = InMemoryStore;

    async fn build(self) -> StoreResult<InMemoryStore> {
        let store = InMemoryStore::new();
        {
            let mut data = store.data.write().await;
            data.extend(self.seed);
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_round_trip() {
        let store = InMemoryStore::new();
        let mut conn = store.connect().await.unwrap();

        conn.set("users:1", "{}").await.unwrap();
        conn.set("orders:1", "{}").await.unwrap();

        assert_eq!(conn.get("users:1").await.unwrap(), Some("{}".to_string()));
        assert_eq!(conn.get("users:2").await.unwrap(), None);
        assert_eq!(conn.keys("users:*").await.unwrap(), vec!["users:1".to_string()]);
        assert!(conn.del("users:1").await.unwrap());
        assert!(!conn.del("users:1").await.unwrap());
        conn.ping().await.unwrap();
    }

    #[tokio::test]
    async fn builder_seeds_entries() {
        let store = InMemoryStore::builder()
            .with_entry("t:1", "one")
            .build()
            .await
            .unwrap();

        assert_eq!(store.raw_get("t:1").await, Some("one".to_string()));
    }

    #[tokio::test]
    async fn unavailable_store_rejects_everything() {
        let store = InMemoryStore::new();
        let mut conn = store.connect().await.unwrap();
        store.set_available(false);

        assert!(matches!(store.connect().await, Err(StoreError::StoreUnavailable(_))));
        assert!(conn.ping().await.is_err());
        assert!(!store.is_valid(&mut conn).await);

        store.set_available(true);
        assert!(store.is_valid(&mut conn).await);
    }

    #[tokio::test]
    async fn write_budget_limits_writes() {
        let store = InMemoryStore::new();
        let mut conn = store.connect().await.unwrap();
        store.fail_writes_after(1);

        conn.set("t:1", "a").await.unwrap();
        assert!(conn.set("t:2", "b").await.is_err());
        assert!(conn.get("t:1").await.unwrap().is_some());

        store.allow_writes();
        conn.set("t:2", "b").await.unwrap();
    }

    #[tokio::test]
    async fn broken_connections_stay_broken() {
        let store = InMemoryStore::new();
        let mut old = store.connect().await.unwrap();
        store.break_connections();
        let mut new = store.connect().await.unwrap();

        assert!(matches!(old.ping().await, Err(StoreError::ConnectionInvalid(_))));
        new.ping().await.unwrap();
        assert_eq!(store.connections_opened(), 2);
    }
}
