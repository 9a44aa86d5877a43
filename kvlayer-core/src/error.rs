//! Error types and result types for store operations.
//!
//! Every fallible operation in this crate returns [`StoreResult<T>`]. Errors never escape
//! a terminal query operation: the execution shell turns them into the error side of a
//! [`QueryResult`](crate::result::QueryResult).

use std::time::Duration;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No connection became available within the pool's acquire timeout.
    #[error("Connection pool exhausted: no connection available within {0:?}")]
    PoolExhausted(Duration),
    /// The pool has been closed and no longer hands out connections.
    #[error("Connection pool is closed")]
    PoolClosed,
    /// A connection failed validation.
    ///
    /// The pool discards connections that fail validation and hands out a replacement.
    /// A connection that breaks in the middle of an operation reports this instead.
    #[error("Connection failed validation: {0}")]
    ConnectionInvalid(String),
    /// A stored value could not be decoded into a document.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
    /// `update` was called with an empty patch.
    #[error("No update data provided")]
    NoUpdateData,
    /// The store could not be reached or rejected a command.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// A multi-record mutation stopped part way through.
    ///
    /// Records before the failing one have already been written or deleted and are not
    /// rolled back.
    #[error("{operation} failed after {completed} of {total} records: {source}")]
    PartialBatch {
        /// The terminal operation that was running (`update` or `delete`).
        operation: &'static str,
        /// How many records were processed successfully before the failure.
        completed: usize,
        /// How many records matched the query.
        total: usize,
        /// The error raised for the record at index `completed`.
        source: Box<StoreError>,
    },
    /// A value could not be serialized into a document.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::MalformedDocument(err.to_string())
    }
}
