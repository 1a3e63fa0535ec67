//! Task queue collaborator and a local, in-process implementation.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{JobId, JobLifecycleManager, ProcessOutcome};
use crate::errors::QueueError;

/// Delivers job ids to workers, at least once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueues a job for immediate processing.
    async fn schedule(&self, job_id: JobId) -> Result<(), QueueError>;

    /// Re-enqueues a failed job after `delay`. `attempt` is the number of
    /// attempts already made.
    async fn retry(&self, job_id: JobId, delay: Duration, attempt: u32) -> Result<(), QueueError>;
}

/// One message on the local queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// The job to process.
    pub job_id: JobId,
    /// Attempts already made when this delivery was enqueued.
    pub attempt: u32,
}

/// Unbounded in-process queue backed by a tokio channel.
///
/// Delayed retries are parked on a spawned timer and delivered when it fires.
#[derive(Debug, Clone)]
pub struct LocalTaskQueue {
    sender: mpsc::UnboundedSender<Delivery>,
}

impl LocalTaskQueue {
    /// Creates the queue and the receiving end for a [`Worker`].
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, delivery: Delivery) -> Result<(), QueueError> {
        self.sender.send(delivery).map_err(|_| QueueError::Closed)
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn schedule(&self, job_id: JobId) -> Result<(), QueueError> {
        tracing::debug!(job_id = %job_id, "Scheduling job");
        self.send(Delivery { job_id, attempt: 0 })
    }

    async fn retry(&self, job_id: JobId, delay: Duration, attempt: u32) -> Result<(), QueueError> {
        if self.sender.is_closed() {
            return Err(QueueError::Closed);
        }
        tracing::info!(
            job_id = %job_id,
            attempt,
            delay_secs = delay.as_secs(),
            "Job retry scheduled"
        );
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if queue.send(Delivery { job_id, attempt }).is_err() {
                tracing::warn!(job_id = %job_id, "Queue closed before retry could be delivered");
            }
        });
        Ok(())
    }
}

/// Drains deliveries into the lifecycle manager, one job at a time.
pub struct Worker {
    manager: Arc<JobLifecycleManager>,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").finish_non_exhaustive()
    }
}

impl Worker {
    /// Creates a worker over a queue's receiving end.
    #[must_use]
    pub fn new(manager: Arc<JobLifecycleManager>, receiver: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { manager, receiver }
    }

    /// Processes the next delivery. Returns `None` once the queue is closed
    /// and drained.
    ///
    /// Task-level errors (such as an unknown job id) are logged and reported
    /// as `Some((job_id, None))`; they are never retried.
    pub async fn step(&mut self) -> Option<(JobId, Option<ProcessOutcome>)> {
        let delivery = self.receiver.recv().await?;
        match self.manager.process(delivery.job_id).await {
            Ok(outcome) => Some((delivery.job_id, Some(outcome))),
            Err(error) => {
                tracing::error!(job_id = %delivery.job_id, %error, "Job task failed");
                Some((delivery.job_id, None))
            }
        }
    }

    /// Processes deliveries until `job_id` reaches a final outcome.
    pub async fn run_until_settled(&mut self, job_id: JobId) -> Option<ProcessOutcome> {
        while let Some((id, outcome)) = self.step().await {
            if id != job_id {
                continue;
            }
            match outcome {
                Some(outcome) if outcome.is_final() => return Some(outcome),
                Some(_) => {}
                None => return None,
            }
        }
        None
    }

    /// Processes deliveries until the queue is closed.
    pub async fn run(mut self) {
        while self.step().await.is_some() {}
        tracing::info!("Task queue closed, worker stopping");
    }
}
