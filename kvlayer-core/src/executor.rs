//! Bounded worker pool for terminal query operations.
//!
//! Every terminal operation is submitted as a task and observed through a [`QueryHandle`].
//! At most `workers` operations run at once; further submissions wait for a free slot
//! without blocking the caller.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::future::BoxFuture;
use tokio::{runtime::Handle, sync::Semaphore, task::JoinHandle};
use tracing::{debug, error};

use crate::{document::Document, error::StoreResult, result::QueryResult};

/// Runs submitted operations with bounded concurrency.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    workers: usize,
    runtime: Handle,
}

impl WorkerPool {
    /// Creates a pool that runs at most `workers` operations at a time on `runtime`.
    pub fn new(workers: usize, runtime: Handle) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(workers)),
            workers,
            runtime,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Schedules an operation and returns a handle to its eventual result.
    ///
    /// A failed operation is logged once here and reported through the result.
    pub fn submit(
        &self,
        operation: &'static str,
        task: BoxFuture<'static, StoreResult<Vec<Document>>>,
    ) -> QueryHandle {
        let slots = Arc::clone(&self.slots);

        let join = self.runtime.spawn(async move {
            let _slot = match slots.acquire_owned().await {
                Ok(slot) => slot,
                Err(_) => return QueryResult::error("worker pool is shut down"),
            };

            match task.await {
                Ok(documents) => {
                    debug!(operation, returned = documents.len(), "operation complete");
                    QueryResult::ok(documents)
                }
                Err(err) => {
                    error!(operation, error = %err, "operation failed");
                    QueryResult::error(err.to_string())
                }
            }
        });

        QueryHandle { operation, join }
    }

    /// Stops accepting work. Operations already holding a slot run to completion.
    pub fn shutdown(&self) {
        self.slots.close();
    }
}

/// The pending result of a submitted operation.
///
/// Await the handle to get the [`QueryResult`]. Dropping it does not cancel the operation.
#[derive(Debug)]
pub struct QueryHandle {
    operation: &'static str,
    join: JoinHandle<QueryResult>,
}

impl QueryHandle {
    /// Name of the operation this handle observes.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Future for QueryHandle {
    type Output = QueryResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;

        Pin::new(&mut self.join).poll(cx).map(|joined| {
            joined.unwrap_or_else(|err| {
                error!(operation, error = %err, "operation task did not complete");
                QueryResult::error(format!("{operation} did not complete: {err}"))
            })
        })
    }
}
