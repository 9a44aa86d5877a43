//! Convenient re-exports of commonly used types from kvlayer.
//!
//! ```ignore
//! use kvlayer::prelude::*;
//! ```

pub use kvlayer_core::{
    backend::{ConnectionManager, KvConnection, ManagerBuilder},
    config::{Config, ConfigError, PoolConfig, RedisConfig},
    document::{Document, DocumentExt, to_document},
    error::{StoreError, StoreResult},
    executor::QueryHandle,
    pool::PoolStatus,
    query::{Filter, Projection, Query, Sort, SortDirection},
    result::QueryResult,
    store::{Store, StoreOptions},
    table::QueryBuilder,
};
