//! Main kvlayer crate: document-style queries over flat key-value stores.
//!
//! This crate is the primary entry point for users of the kvlayer framework. It re-exports
//! the core types from the sub-crates and gives access to the available backends.
//!
//! Documents are JSON objects stored as strings under `"<table>:<id>"` keys. A [`Store`]
//! owns a bounded connection pool and a bounded worker pool; every terminal operation runs
//! on a worker and resolves to a [`QueryResult`] that carries either documents or an error
//! message.
//!
//! # Features
//!
//! - **Immutable query builder** - `select`, `eq` and `order` derive new queries freely
//! - **Pooled connections** - Validated, bounded, with idle checks and timeouts
//! - **Uniform results** - Every failure becomes an error result instead of a panic
//! - **Multiple backends** - In-memory for tests, Redis behind the `redis` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use kvlayer::{prelude::*, memory::InMemoryStore};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     kvlayer::telemetry::init_tracing();
//!
//!     let store = Store::connect(InMemoryStore::new(), StoreOptions::default())
//!         .await
//!         .unwrap();
//!     let users = store.from_table("users");
//!
//!     // Insert a document; an id is generated because none is given
//!     let inserted = users.insert_value(&json!({ "name": "Alice", "age": 30 })).await;
//!     assert!(!inserted.has_error());
//!
//!     // Query with a filter, an ordering and a projection
//!     let result = users
//!         .eq("name", "Alice")
//!         .order_by("age", SortDirection::Desc)
//!         .select("id, age")
//!         .execute()
//!         .await;
//!
//!     println!("Queried users: {:?}", result.data());
//!
//!     store.close().await;
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`redis`] - Redis storage (requires the `redis` feature)

pub mod prelude;
pub mod telemetry;

pub use kvlayer_core::{
    backend, config, document, engine, error, executor, pool, query, result, store, table, value,
};
pub use kvlayer_core::{
    config::Config,
    result::QueryResult,
    store::{Store, StoreOptions},
};

// Re-export JSON types for convenience
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use kvlayer_memory::{InMemoryStore, InMemoryStoreBuilder, MemoryConnection};
}

/// Redis storage backend implementations.
///
/// This module is only available when the `redis` feature is enabled.
#[cfg(feature = "redis")]
pub mod redis {
    pub use kvlayer_redis::{RedisConnection, RedisManager, RedisManagerBuilder, connection_url};

    use kvlayer_core::{config::Config, error::StoreResult, store::Store};

    /// Connects a store to the Redis server described by `config`.
    pub async fn connect(config: &Config) -> StoreResult<Store<RedisManager>> {
        Store::build(RedisManager::builder(config.redis.clone()), config.into()).await
    }
}
