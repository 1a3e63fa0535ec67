//! Jobs: durable records of dataset requests and the machinery that runs them.
//!
//! This module provides:
//! - The [`Job`] record and its state machine
//! - [`JobStore`] and [`UploadStore`] collaborators with in-memory and
//!   filesystem implementations
//! - The [`TaskQueue`] collaborator, a local queue and a [`Worker`]
//! - [`JobLifecycleManager`], the single owner of status changes
//! - [`submit_job`] and [`JobQuery`], the thin outer surface

mod artifact;
mod lifecycle;
mod model;
mod query;
mod queue;
mod store;
mod uploads;

#[cfg(test)]
mod integration_tests;

pub use crate::core::JobStatus;
pub use artifact::{to_ndjson, write_atomic, ArtifactPaths, ArtifactWriter};
pub use lifecycle::{JobLifecycleManager, ProcessOutcome};
pub use model::{Job, JobId, JobStatusView};
pub use query::{submit_job, JobQuery};
#[cfg(test)]
pub use queue::MockTaskQueue;
pub use queue::{Delivery, LocalTaskQueue, TaskQueue, Worker};
pub use store::{FileJobStore, InMemoryJobStore, JobStore};
pub use uploads::{FsUploadStore, UploadStore};
