//! Query execution over a pooled key-value connection.
//!
//! Read-style operations run a fixed pipeline:
//!
//! 1. **Scan** every key under `"<table>:"`
//! 2. **Fetch + decode** each value; absent or malformed values are skipped
//! 3. **Filter** by the query's equality clauses
//! 4. **Order** by the query's sort, for [`Engine::execute`] only
//! 5. **Project** the requested fields
//!
//! Each operation holds one connection from acquire to release. Mutations are applied one
//! record at a time with no atomicity across records.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    backend::{ConnectionManager, KvConnection, escape_glob},
    document::{Document, DocumentExt, ID_FIELD, decode, encode, key_component},
    error::{StoreError, StoreResult},
    pool::Pool,
    query::{Query, Sort},
    value::{SortMode, compare_fields},
};

/// A scanned document together with the key it was read from.
///
/// The key never becomes part of the document, so it cannot be persisted or returned.
#[derive(Debug, Clone)]
struct Row {
    key: String,
    document: Document,
}

/// Derives the storage key of a document.
pub fn storage_key(table: &str, id: &str) -> String {
    format!("{table}:{id}")
}

/// Executes queries and mutations against connections from a [`Pool`].
#[derive(Debug)]
pub struct Engine<M: ConnectionManager> {
    pool: Pool<M>,
}

impl<M: ConnectionManager> Engine<M> {
    pub fn new(pool: Pool<M>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    /// Runs the full pipeline and returns every match.
    pub async fn execute(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let result = execute_on(&mut *conn, query).await;
        conn.release().await;

        result
    }

    /// Returns the first match in scan order.
    ///
    /// The query's sort is deliberately not applied: `single` takes the first document
    /// that passes the filters as the scan produced it, while [`execute`](Self::execute)
    /// orders before returning. Use `execute` and take the first document when the
    /// ordering matters.
    pub async fn single(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let result = single_on(&mut *conn, query).await;
        conn.release().await;

        result
    }

    /// Stores a document under the query's table, assigning an id if it has none.
    ///
    /// Filters, projection and sort are ignored. An existing document with the same id is
    /// overwritten.
    pub async fn insert(&self, query: &Query, document: Document) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let result = insert_on(&mut *conn, &query.table, document).await;
        conn.release().await;

        result
    }

    /// Merges `patch` into every match and writes each one back to its key.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NoUpdateData`] if `patch` is empty, before touching the store
    /// - [`StoreError::PartialBatch`] if a write fails after matching
    pub async fn update(&self, query: &Query, patch: Document) -> StoreResult<Vec<Document>> {
        if patch.is_empty() {
            return Err(StoreError::NoUpdateData);
        }

        let mut conn = self.pool.acquire().await?;
        let result = update_on(&mut *conn, query, &patch).await;
        conn.release().await;

        result
    }

    /// Deletes every match and returns the deleted documents.
    ///
    /// A query without filters deletes the whole table.
    pub async fn delete(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let result = delete_on(&mut *conn, query).await;
        conn.release().await;

        result
    }

    /// Reads one document by its full storage key, bypassing tables and filters.
    ///
    /// A missing key yields no documents. Unlike a scan, a malformed value is an error.
    pub async fn get_by_key(&self, key: &str) -> StoreResult<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let result = get_by_key_on(&mut *conn, key).await;
        conn.release().await;

        result
    }
}

async fn scan<C: KvConnection>(conn: &mut C, table: &str) -> StoreResult<Vec<Row>> {
    let pattern = format!("{}:*", escape_glob(table));
    let keys = conn.keys(&pattern).await?;
    let mut rows = Vec::with_capacity(keys.len());

    for key in keys {
        let Some(raw) = conn.get(&key).await? else {
            debug!(%key, "key disappeared during scan");
            continue;
        };

        match decode(&raw) {
            Ok(document) => rows.push(Row { key, document }),
            Err(err) => warn!(%key, error = %err, "skipping undecodable document"),
        }
    }

    debug!(table, scanned = rows.len(), "scan complete");
    Ok(rows)
}

async fn fetch_matching<C: KvConnection>(
    conn: &mut C,
    query: &Query,
) -> StoreResult<Vec<Row>> {
    let mut rows = scan(conn, &query.table).await?;
    rows.retain(|row| query.matches(&row.document));

    debug!(table = %query.table, matched = rows.len(), "filter applied");
    Ok(rows)
}

fn order_rows(rows: &mut [Row], sort: &Sort) {
    let mode = SortMode::for_values(
        rows
            .iter()
            .filter_map(|row| row.document.get(&sort.field))
    );

    rows.sort_by(|a, b| {
        compare_fields(
            a.document.get(&sort.field),
            b.document.get(&sort.field),
            mode,
            &sort.direction,
        )
    });
}

async fn execute_on<C: KvConnection>(
    conn: &mut C,
    query: &Query,
) -> StoreResult<Vec<Document>> {
    let mut rows = fetch_matching(conn, query).await?;

    if let Some(sort) = &query.sort {
        order_rows(&mut rows, sort);
    }

    Ok(
        rows
            .into_iter()
            .map(|row| query.projection.apply(row.document))
            .collect()
    )
}

async fn single_on<C: KvConnection>(
    conn: &mut C,
    query: &Query,
) -> StoreResult<Vec<Document>> {
    Ok(
        fetch_matching(conn, query)
            .await?
            .into_iter()
            .next()
            .map(|row| query.projection.apply(row.document))
            .into_iter()
            .collect()
    )
}

async fn insert_on<C: KvConnection>(
    conn: &mut C,
    table: &str,
    mut document: Document,
) -> StoreResult<Vec<Document>> {
    let id = match document.document_id() {
        Some(id) => key_component(id),
        None => {
            let id = Uuid::new_v4().to_string();
            document.insert(ID_FIELD.to_string(), id.clone().into());
            id
        }
    };

    let key = storage_key(table, &id);
    conn.set(&key, &encode(&document)).await?;

    debug!(%key, "document inserted");
    Ok(vec![document])
}

async fn update_on<C: KvConnection>(
    conn: &mut C,
    query: &Query,
    patch: &Document,
) -> StoreResult<Vec<Document>> {
    let rows = fetch_matching(conn, query).await?;
    let total = rows.len();
    let mut updated = Vec::with_capacity(total);

    for (completed, Row { key, mut document }) in rows.into_iter().enumerate() {
        document.merge(patch);

        if let Err(err) = conn.set(&key, &encode(&document)).await {
            return Err(StoreError::PartialBatch {
                operation: "update",
                completed,
                total,
                source: Box::new(err),
            });
        }

        updated.push(document);
    }

    debug!(table = %query.table, updated = total, "update complete");
    Ok(updated)
}

async fn delete_on<C: KvConnection>(
    conn: &mut C,
    query: &Query,
) -> StoreResult<Vec<Document>> {
    let rows = fetch_matching(conn, query).await?;
    let total = rows.len();
    let mut deleted = Vec::with_capacity(total);

    for (completed, Row { key, document }) in rows.into_iter().enumerate() {
        if let Err(err) = conn.del(&key).await {
            return Err(StoreError::PartialBatch {
                operation: "delete",
                completed,
                total,
                source: Box::new(err),
            });
        }

        deleted.push(document);
    }

    debug!(table = %query.table, deleted = total, "delete complete");
    Ok(deleted)
}

async fn get_by_key_on<C: KvConnection>(
    conn: &mut C,
    key: &str,
) -> StoreResult<Vec<Document>> {
    match conn.get(key).await? {
        Some(raw) => Ok(vec![decode(&raw)?]),
        None => Ok(vec![]),
    }
}
