//! Fluent query handle bound to a table.
//!
//! A [`QueryBuilder`] pairs an immutable [`Query`] with the store that will run it. Chaining
//! methods return new builders and never touch storage; only the terminal operations
//! (`execute`, `single`, `insert`, `update`, `delete`) submit work, each returning a
//! [`QueryHandle`].
//!
//! # Examples
//!
//! ```ignore
//! let adults = store
//!     .from_table("users")
//!     .select("id, name")
//!     .eq("role", "admin")
//!     .order_by("age", SortDirection::Desc)
//!     .execute()
//!     .await;
//!
//! if adults.has_error() {
//!     eprintln!("{}", adults.error_message().unwrap_or_default());
//! }
//! ```

use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use crate::{
    backend::ConnectionManager,
    document::{Document, to_document},
    executor::QueryHandle,
    query::{Query, SortDirection},
    store::StoreInner,
};

/// A query under construction for one table.
pub struct QueryBuilder<M: ConnectionManager> {
    store: Arc<StoreInner<M>>,
    query: Query,
}

impl<M: ConnectionManager> Clone for QueryBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            query: self.query.clone(),
        }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for QueryBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("query", &self.query)
            .finish()
    }
}

impl<M: ConnectionManager> QueryBuilder<M> {
    pub(crate) fn new(store: Arc<StoreInner<M>>, table: &str) -> Self {
        Self { store, query: Query::new(table) }
    }

    fn with_query(&self, query: Query) -> Self {
        Self { store: Arc::clone(&self.store), query }
    }

    /// The query this builder would run.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Sets the projection from a comma-separated column list; `"*"` selects everything.
    pub fn select(&self, columns: &str) -> Self {
        self.with_query(self.query.select(columns))
    }

    /// Sets the projection to explicit column names.
    pub fn select_columns<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_query(self.query.select_columns(columns))
    }

    /// Adds an equality filter. Filters are combined with AND.
    pub fn eq(&self, field: &str, value: impl Into<Value>) -> Self {
        self.with_query(self.query.eq(field, value))
    }

    /// Orders results ascending by `field`, replacing any previous ordering.
    pub fn order(&self, field: &str) -> Self {
        self.with_query(self.query.order(field))
    }

    /// Orders results by `field` in the given direction.
    pub fn order_by(&self, field: &str, direction: SortDirection) -> Self {
        self.with_query(self.query.order_by(field, direction))
    }

    /// Returns every matching document, filtered, ordered and projected.
    pub fn execute(&self) -> QueryHandle {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();

        self.store.workers.submit(
            "execute",
            async move { store.engine.execute(&query).await }.boxed(),
        )
    }

    /// Returns at most one matching document.
    ///
    /// Ordering is not applied; see [`Engine::single`](crate::engine::Engine::single).
    pub fn single(&self) -> QueryHandle {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();

        self.store.workers.submit(
            "single",
            async move { store.engine.single(&query).await }.boxed(),
        )
    }

    /// Inserts `document` into this builder's table and returns it with its id.
    pub fn insert(&self, document: Document) -> QueryHandle {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();

        self.store.workers.submit(
            "insert",
            async move { store.engine.insert(&query, document).await }.boxed(),
        )
    }

    /// Serializes `value` into a document and inserts it.
    ///
    /// A value that does not serialize to a JSON object resolves to an error result.
    pub fn insert_value<T: Serialize>(&self, value: &T) -> QueryHandle {
        match to_document(value) {
            Ok(document) => self.insert(document),
            Err(err) => self.store.workers.submit("insert", async move { Err(err) }.boxed()),
        }
    }

    /// Merges `patch` into every matching document.
    pub fn update(&self, patch: Document) -> QueryHandle {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();

        self.store.workers.submit(
            "update",
            async move { store.engine.update(&query, patch).await }.boxed(),
        )
    }

    /// Deletes every matching document.
    pub fn delete(&self) -> QueryHandle {
        let store = Arc::clone(&self.store);
        let query = self.query.clone();

        self.store.workers.submit(
            "delete",
            async move { store.engine.delete(&query).await }.boxed(),
        )
    }
}
