//! A document-style query layer over flat key-value stores.
//!
//! This crate is the core of the kvlayer project and provides:
//!
//! - **Backend abstraction** ([`backend`]) - Traits a key-value store implements to be queried
//! - **Connection pool** ([`pool`]) - Bounded, validating pool of backend connections
//! - **Documents** ([`document`]) - JSON document type, codec and storage key rules
//! - **Queries** ([`query`]) - Immutable query values with projection, filters and ordering
//! - **Query engine** ([`engine`]) - Scan, filter, order and project over raw keys
//! - **Execution** ([`executor`], [`result`]) - Bounded worker pool and uniform results
//! - **Store client** ([`store`], [`table`]) - The entry point tying it all together
//! - **Configuration** ([`config`]) - Layered TOML and environment configuration
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use kvlayer_core::store::{Store, StoreOptions};
//! use serde_json::json;
//!
//! let store = Store::connect(manager, StoreOptions::default()).await?;
//! let users = store.from_table("users");
//!
//! users.insert(json!({ "name": "Ada", "age": 36 }).as_object().cloned().unwrap()).await;
//!
//! let result = users.eq("name", "Ada").select("id, age").execute().await;
//! assert!(!result.has_error());
//! ```

pub mod backend;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod pool;
pub mod query;
pub mod result;
pub mod store;
pub mod table;
pub mod value;
