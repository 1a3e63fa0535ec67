//! Bounded fan-out over a dynamic list of work items.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs one task per item with at most `limit` in flight, and joins on all.
///
/// Every item yields exactly one slot in the output, at the item's original
/// position. A task that panics leaves its slot empty instead of taking the
/// others down with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedTaskPool {
    limit: usize,
}

impl BoundedTaskPool {
    /// Creates a pool. A limit of zero is treated as one.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// The concurrency bound.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Spawns `work` for every item and waits for all of them.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Vec<Option<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<R>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.limit));
        let work = Arc::new(work);

        let handles: Vec<JoinHandle<Option<R>>> = items
            .into_iter()
            .map(|item| {
                let semaphore = Arc::clone(&semaphore);
                let work = Arc::clone(&work);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    work(item).await
                })
            })
            .collect();

        let mut slots: Vec<Option<R>> = Vec::with_capacity(handles.len());
        for (position, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(outcome) => slots.push(outcome),
                Err(join_error) => {
                    tracing::error!(position, error = %join_error, "Fan-out task did not complete");
                    slots.push(None);
                }
            }
        }
        slots
    }
}

impl Default for BoundedTaskPool {
    fn default() -> Self {
        Self::new(8)
    }
}
