//! Bounded pool of validated store connections.
//!
//! The pool hands out at most `max_total` connections at a time. Callers that find it
//! exhausted wait up to `acquire_timeout` before failing with
//! [`StoreError::PoolExhausted`]. Connections are validated when handed out, when given back
//! and periodically while idle; one that fails validation is closed and never reaches a
//! caller.
//!
//! A [`PooledConnection`] goes back to the pool through [`PooledConnection::release`] or,
//! on any early-return path, when it is dropped.

use std::{
    collections::VecDeque,
    ops::{Deref, DerefMut},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use mea::mutex::Mutex;
use tokio::{
    runtime::Handle,
    sync::{OwnedSemaphorePermit, Semaphore},
    time::timeout,
};
use tracing::{debug, info, warn};

use crate::{
    backend::ConnectionManager,
    config::PoolConfig,
    error::{StoreError, StoreResult},
};

/// Point-in-time counters for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Maximum number of connections handed out at once.
    pub max_size: usize,
    /// Connections currently open and waiting in the pool.
    pub idle: usize,
    /// Connections currently held by callers.
    pub in_use: usize,
}

struct PoolInner<M: ConnectionManager> {
    manager: M,
    config: PoolConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<M::Connection>>,
    closed: AtomicBool,
    runtime: Handle,
}

/// A bounded, validating connection pool.
///
/// Cloning a `Pool` is cheap; clones share the same connections.
pub struct Pool<M: ConnectionManager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("manager", &self.inner.manager)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl<M: ConnectionManager> Pool<M> {
    /// Creates a pool, opens `min_idle` connections and starts the idle check.
    ///
    /// Warm-up is best effort: a store that is down at startup is reported through
    /// logging and surfaces again on the first acquire.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Initialization`] if the configuration is inconsistent or no
    /// tokio runtime is running.
    pub async fn new(manager: M, config: PoolConfig) -> StoreResult<Self> {
        config
            .validate()
            .map_err(|e| StoreError::Initialization(e.to_string()))?;
        let runtime = Handle::try_current()
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        let inner = Arc::new(PoolInner {
            permits: Arc::new(Semaphore::new(config.max_total)),
            idle: Mutex::new(VecDeque::with_capacity(config.max_idle)),
            closed: AtomicBool::new(false),
            manager,
            config,
            runtime,
        });

        inner.fill_idle().await;
        Self::spawn_idle_check(&inner);

        info!(
            max_total = inner.config.max_total,
            min_idle = inner.config.min_idle,
            "connection pool ready"
        );

        Ok(Self { inner })
    }

    fn spawn_idle_check(inner: &Arc<PoolInner<M>>) {
        let Some(period) = inner.config.idle_check_interval() else {
            return;
        };
        let pool = Arc::downgrade(inner);

        inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; warm-up just ran.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(inner) = pool.upgrade() else {
                    break;
                };
                if inner.closed.load(Ordering::Acquire) {
                    break;
                }

                inner.check_idle().await;
            }
        });
    }

    /// Takes a connection from the pool, waiting up to the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PoolExhausted`] if no connection frees up in time
    /// - [`StoreError::PoolClosed`] if the pool has been closed
    /// - [`StoreError::StoreUnavailable`] if a new connection cannot be opened
    pub async fn acquire(&self) -> StoreResult<PooledConnection<M>> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StoreError::PoolClosed);
        }

        let wait = self.inner.config.acquire_timeout();
        let permit = match timeout(wait, Arc::clone(&self.inner.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(StoreError::PoolClosed),
            Err(_) => {
                warn!(?wait, "connection pool exhausted");
                return Err(StoreError::PoolExhausted(wait));
            }
        };

        let conn = self.inner.checkout().await?;

        Ok(PooledConnection {
            conn: Some(conn),
            permit: Some(permit),
            pool: Arc::clone(&self.inner),
        })
    }

    /// Returns the current pool counters.
    pub async fn status(&self) -> PoolStatus {
        let idle = self.inner.idle.lock().await.len();
        let max_size = self.inner.config.max_total;

        PoolStatus {
            max_size,
            idle,
            in_use: max_size.saturating_sub(self.inner.permits.available_permits()),
        }
    }

    /// Closes the pool: idle connections are dropped and later acquires fail.
    ///
    /// Connections still held by callers are closed when they come back.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.permits.close();
        let drained = std::mem::take(&mut *self.inner.idle.lock().await);

        info!(closed = drained.len(), "connection pool closed");
    }
}

impl<M: ConnectionManager> PoolInner<M> {
    async fn checkout(&self) -> StoreResult<M::Connection> {
        loop {
            let candidate = self.idle.lock().await.pop_back();
            let Some(mut conn) = candidate else {
                break;
            };

            if !self.config.test_on_acquire || self.manager.is_valid(&mut conn).await {
                return Ok(conn);
            }

            warn!("discarding idle connection that failed validation on acquire");
        }

        let mut conn = self.manager.connect().await?;
        if self.config.test_on_acquire && !self.manager.is_valid(&mut conn).await {
            return Err(StoreError::StoreUnavailable(
                "newly opened connection failed validation".to_string(),
            ));
        }

        debug!("opened new connection");
        Ok(conn)
    }

    async fn recycle(&self, mut conn: M::Connection) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if self.config.test_on_release && !self.manager.is_valid(&mut conn).await {
            warn!("discarding connection that failed validation on release");
            return;
        }

        let mut idle = self.idle.lock().await;
        if idle.len() < self.config.max_idle {
            idle.push_back(conn);
        } else {
            debug!("closing surplus idle connection");
        }
    }

    async fn check_idle(&self) {
        if self.config.test_while_idle {
            let candidates = std::mem::take(&mut *self.idle.lock().await);
            let mut healthy = Vec::with_capacity(candidates.len());
            let mut discarded = 0usize;

            for mut conn in candidates {
                if self.manager.is_valid(&mut conn).await {
                    healthy.push(conn);
                } else {
                    discarded += 1;
                }
            }

            if discarded > 0 {
                warn!(discarded, "discarded idle connections that failed validation");
            }

            // Connections released during validation may already fill the queue.
            let mut idle = self.idle.lock().await;
            for conn in healthy {
                if idle.len() < self.config.max_idle {
                    idle.push_back(conn);
                }
            }
        }

        self.fill_idle().await;
    }

    /// Opens connections until `min_idle` are waiting, without exceeding `max_total`.
    async fn fill_idle(&self) {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return;
            }

            let idle = self.idle.lock().await.len();
            if idle >= self.config.min_idle || idle >= self.permits.available_permits() {
                return;
            }

            match self.manager.connect().await {
                Ok(conn) => self.idle.lock().await.push_back(conn),
                Err(err) => {
                    warn!(error = %err, "failed to open idle connection");
                    return;
                }
            }
        }
    }
}

/// A connection checked out of a [`Pool`].
///
/// Dereferences to the backend connection. Call [`release`](Self::release) when done;
/// a connection that is dropped instead is validated and returned in the background.
pub struct PooledConnection<M: ConnectionManager> {
    conn: Option<M::Connection>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<PoolInner<M>>,
}

impl<M: ConnectionManager> PooledConnection<M> {
    /// Returns the connection to the pool.
    pub async fn release(mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.recycle(conn).await;
        }
        self.permit.take();
    }
}

impl<M: ConnectionManager> std::fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("manager", &self.pool.manager)
            .field("released", &self.conn.is_none())
            .finish()
    }
}

impl<M: ConnectionManager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("connection is present until released")
    }
}

impl<M: ConnectionManager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("connection is present until released")
    }
}

impl<M: ConnectionManager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        let permit = self.permit.take();
        let pool = Arc::clone(&self.pool);

        debug!("connection dropped without release, recycling in background");
        self.pool.runtime.spawn(async move {
            pool.recycle(conn).await;
            drop(permit);
        });
    }
}
