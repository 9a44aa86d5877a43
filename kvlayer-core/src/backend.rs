//! Key-value backend abstraction.
//!
//! The query layer only needs five commands from a store: `GET`, `SET`, `DEL`, `KEYS` with a
//! glob pattern, and `PING`. A backend provides them through two traits:
//!
//! - [`KvConnection`]: one live connection that executes commands
//! - [`ConnectionManager`]: opens and validates connections for the [`Pool`](crate::pool::Pool)
//!
//! [`ManagerBuilder`] is the async factory for a manager, mirroring how backends are
//! configured and connected at startup.
//!
//! # Examples
//!
//! ```ignore
//! use kvlayer::backend::{ConnectionManager, KvConnection};
//!
//! let manager = InMemoryStore::new();
//! let mut conn = manager.connect().await?;
//! conn.set("users:1", r#"{"id":"1"}"#).await?;
//! assert_eq!(conn.keys("users:*").await?, vec!["users:1".to_string()]);
//! ```

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::StoreResult;

/// A single connection to a key-value store.
///
/// Connections are never shared between concurrent operations: the pool hands each one to
/// exactly one caller at a time, hence the `&mut self` receivers.
#[async_trait]
pub trait KvConnection: Send {
    /// Reads the value stored at `key`, or `None` if the key does not exist.
    async fn get(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` at `key`, overwriting any previous value.
    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes `key`. Returns whether the key existed.
    async fn del(&mut self, key: &str) -> StoreResult<bool>;

    /// Lists every key matching a glob pattern (`*`, `?`, `[...]`, `\` escapes).
    async fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>>;

    /// Round-trips a no-op command to prove the connection is usable.
    async fn ping(&mut self) -> StoreResult<()>;
}

/// Opens and validates connections on behalf of the pool.
#[async_trait]
pub trait ConnectionManager: Send + Sync + Debug + 'static {
    /// The connection type this manager produces.
    type Connection: KvConnection + 'static;

    /// Opens a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`](crate::error::StoreError::StoreUnavailable)
    /// if the store cannot be reached.
    async fn connect(&self) -> StoreResult<Self::Connection>;

    /// Returns whether a connection is still usable.
    ///
    /// The default implementation sends a `PING`.
    async fn is_valid(&self, conn: &mut Self::Connection) -> bool {
        conn.ping().await.is_ok()
    }
}

/// Async factory for a [`ConnectionManager`].
#[async_trait]
pub trait ManagerBuilder {
    /// The manager this builder produces.
    type Manager: ConnectionManager;

    /// Builds the manager.
    async fn build(self) -> StoreResult<Self::Manager>;
}

/// Escapes glob metacharacters so `raw` only matches itself inside a `KEYS` pattern.
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());

    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}
