use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use kvlayer_core::{
    backend::{ConnectionManager, KvConnection, ManagerBuilder},
    config::RedisConfig,
    error::{StoreError, StoreResult},
};

/// Builds the `redis://` URL for a configuration.
///
/// The password, if any, is percent-encoded into the URL; an empty password leaves the
/// connection unauthenticated.
pub fn connection_url(config: &RedisConfig) -> StoreResult<Url> {
    let host = if config.host.contains(':') && !config.host.starts_with('[') {
        format!("[{}]", config.host)
    } else {
        config.host.clone()
    };

    let mut url = Url::parse(&format!("redis://{host}:{}/", config.port))
        .map_err(|e| StoreError::Initialization(format!("invalid redis address: {e}")))?;

    if let Some(password) = config.password() {
        url.set_password(Some(password))
            .map_err(|_| StoreError::Initialization("redis url cannot carry a password".into()))?;
    }

    Ok(url)
}

fn unavailable(err: RedisError) -> StoreError {
    StoreError::StoreUnavailable(err.to_string())
}

/// Opens multiplexed tokio connections to one Redis server.
pub struct RedisManager {
    client: Client,
    address: String,
    connect_timeout: Duration,
}

impl std::fmt::Debug for RedisManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisManager")
            .field("address", &self.address)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl RedisManager {
    /// Creates a manager for the configured server. No connection is opened yet.
    pub fn new(config: &RedisConfig) -> StoreResult<Self> {
        let url = connection_url(config)?;
        let client = Client::open(url.as_str())
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        Ok(Self {
            client,
            address: format!("{}:{}", config.host, config.port),
            connect_timeout: config.connect_timeout(),
        })
    }

    pub fn builder(config: RedisConfig) -> RedisManagerBuilder {
        RedisManagerBuilder::new(config)
    }

    /// The `host:port` this manager connects to.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectionManager for RedisManager {
    type Connection = RedisConnection;

    async fn connect(&self) -> StoreResult<RedisConnection> {
        let conn = timeout(self.connect_timeout, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                StoreError::StoreUnavailable(format!(
                    "timed out after {:?} connecting to {}",
                    self.connect_timeout, self.address
                ))
            })?
            .map_err(unavailable)?;

        debug!(address = %self.address, "opened redis connection");
        Ok(RedisConnection { conn })
    }
}

/// One Redis connection as seen by the pool.
pub struct RedisConnection {
    conn: MultiplexedConnection,
}

#[async_trait]
impl KvConnection for RedisConnection {
    async fn get(&mut self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = self.conn.get(key).await.map_err(unavailable)?;
        Ok(value)
    }

    async fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let _: () = self.conn.set(key, value).await.map_err(unavailable)?;
        Ok(())
    }

    async fn del(&mut self, key: &str) -> StoreResult<bool> {
        let removed: usize = self.conn.del(key).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn keys(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        let keys: Vec<String> = self.conn.keys(pattern).await.map_err(unavailable)?;
        Ok(keys)
    }

    async fn ping(&mut self) -> StoreResult<()> {
        let _: String = redis::cmd("PING")
            .query_async(&mut self.conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

pub struct RedisManagerBuilder {
    config: RedisConfig,
}

impl RedisManagerBuilder {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ManagerBuilder for RedisManagerBuilder {
    type Manager = RedisManager;

    async fn build(self) -> StoreResult<Self::Manager> {
        RedisManager::new(&self.config)
    }
}
