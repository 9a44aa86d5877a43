//! The store client: owns the connection pool and the worker pool.
//!
//! A [`Store`] is created once per backend and passed to whoever needs it; there is no
//! process-wide instance. Cloning is cheap and clones share every resource.
//!
//! # Example
//!
//! ```ignore
//! use kvlayer::{Store, StoreOptions, memory::InMemoryStore};
//!
//! let store = Store::connect(InMemoryStore::new(), StoreOptions::default()).await?;
//! let inserted = store.from_table("users").insert(document).await;
//! let found = store.get_by_key("users:1").await;
//! store.close().await;
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tracing::info;

use crate::{
    backend::{ConnectionManager, ManagerBuilder},
    config::{Config, PoolConfig},
    engine::Engine,
    error::{StoreError, StoreResult},
    executor::{QueryHandle, WorkerPool},
    pool::{Pool, PoolStatus},
    table::QueryBuilder,
};

/// Tuning for a [`Store`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub pool: PoolConfig,
    /// Number of operations that run at the same time.
    pub workers: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            workers: 4,
        }
    }
}

impl From<&Config> for StoreOptions {
    fn from(config: &Config) -> Self {
        Self {
            pool: config.pool.clone(),
            workers: config.workers.threads,
        }
    }
}

pub(crate) struct StoreInner<M: ConnectionManager> {
    pub(crate) engine: Engine<M>,
    pub(crate) workers: WorkerPool,
}

/// Client for a document-style store over a key-value backend.
pub struct Store<M: ConnectionManager> {
    inner: Arc<StoreInner<M>>,
}

impl<M: ConnectionManager> Clone for Store<M> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for Store<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("pool", self.inner.engine.pool())
            .field("workers", &self.inner.workers.workers())
            .finish()
    }
}

impl<M: ConnectionManager> Store<M> {
    /// Creates a store over `manager`, warming up the connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`] if the options are inconsistent or no tokio
    /// runtime is running.
    pub async fn connect(manager: M, options: StoreOptions) -> StoreResult<Self> {
        if options.workers == 0 {
            return Err(StoreError::Initialization(
                "worker count must be at least 1".to_string(),
            ));
        }

        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        let pool = Pool::new(manager, options.pool).await?;

        info!(workers = options.workers, "store ready");

        Ok(Self {
            inner: Arc::new(StoreInner {
                engine: Engine::new(pool),
                workers: WorkerPool::new(options.workers, runtime),
            }),
        })
    }

    /// Builds the manager with `builder`, then connects as [`connect`](Self::connect).
    pub async fn build<B>(builder: B, options: StoreOptions) -> StoreResult<Self>
    where
        B: ManagerBuilder<Manager = M>,
    {
        let manager = builder.build().await?;
        Self::connect(manager, options).await
    }

    /// Starts a query against `table`.
    pub fn from_table(&self, table: &str) -> QueryBuilder<M> {
        QueryBuilder::new(Arc::clone(&self.inner), table)
    }

    /// Looks up one document by its full storage key, e.g. `"users:42"`.
    ///
    /// A missing key resolves to an empty, successful result.
    pub fn get_by_key(&self, key: &str) -> QueryHandle {
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();

        self.inner.workers.submit(
            "get_by_key",
            async move { inner.engine.get_by_key(&key).await }.boxed(),
        )
    }

    /// The connection pool behind this store.
    pub fn pool(&self) -> &Pool<M> {
        self.inner.engine.pool()
    }

    pub async fn pool_status(&self) -> PoolStatus {
        self.inner.engine.pool().status().await
    }

    /// Stops accepting operations and closes the connection pool.
    pub async fn close(&self) {
        self.inner.workers.shutdown();
        self.inner.engine.pool().close().await;
    }
}
