//! Redis backend implementation for kvlayer.
//!
//! This crate provides a Redis-based implementation of the
//! [`ConnectionManager`](kvlayer_core::backend::ConnectionManager) trait, so documents are
//! persisted as JSON strings in a Redis database and queried through the pooled
//! `GET`/`SET`/`DEL`/`KEYS` commands.
//!
//! To use this backend, include the `redis` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! kvlayer = { version = "x.y.z", features = ["redis"] }
//! ```
//!
//! # Connection
//!
//! Connections are multiplexed tokio connections opened from a
//! [`RedisConfig`](kvlayer_core::config::RedisConfig). An empty password means the server
//! is accessed unauthenticated.
//!
//! # Example
//!
//! ```ignore
//! use kvlayer::{Store, StoreOptions, config::Config, redis::RedisManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_with_layers(Some("kvlayer.toml".as_ref()))?;
//!     let store = Store::build(RedisManager::builder(config.redis.clone()), (&config).into()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{RedisConnection, RedisManager, RedisManagerBuilder, connection_url};
