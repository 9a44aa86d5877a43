//! In-memory key-value backend for kvlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! [`ConnectionManager`](kvlayer_core::backend::ConnectionManager) and
//! [`KvConnection`](kvlayer_core::backend::KvConnection) traits. It stores raw string values
//! under string keys, exactly as a Redis database would, and is meant for development and
//! testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Glob key scans** - `KEYS` patterns with `*`, `?`, classes and escapes
//! - **Fault injection** - Take the store offline, reject writes, or reset connections
//!
//! # Quick Start
//!
//! ```ignore
//! use kvlayer::{Store, StoreOptions, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::connect(InMemoryStore::new(), StoreOptions::default()).await?;
//!     let users = store.from_table("users");
//!
//!     let inserted = users.insert_value(&json!({ "name": "Alice" })).await;
//!     assert_eq!(inserted.len(), 1);
//!
//!     Ok(())
//! }
//! ```

pub mod glob;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder, MemoryConnection};
