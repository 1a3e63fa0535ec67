//! Submission and query surface over the job store.

use std::path::PathBuf;
use std::sync::Arc;

use super::{Job, JobId, JobStatusView, JobStore, TaskQueue, UploadStore};
use crate::core::{InputFile, JobStatus};
use crate::errors::JobError;

/// Creates a pending job for `files`, stores its uploads and schedules it.
///
/// The recipe name is stored as given; an unknown name fails the job when
/// it is processed.
pub async fn submit_job(
    store: &dyn JobStore,
    uploads: &dyn UploadStore,
    queue: &dyn TaskQueue,
    recipe: &str,
    files: &[InputFile],
) -> Result<JobId, JobError> {
    let job = Job::new(recipe);
    uploads.save(job.id, files).await?;
    store.put(&job).await?;
    queue.schedule(job.id).await?;
    tracing::info!(job_id = %job.id, recipe, files = files.len(), "Job submitted");
    Ok(job.id)
}

/// Read-only view of jobs for status polling and downloads.
#[derive(Clone)]
pub struct JobQuery {
    store: Arc<dyn JobStore>,
}

impl std::fmt::Debug for JobQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQuery").finish_non_exhaustive()
    }
}

impl JobQuery {
    /// Creates a query surface over a store.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    async fn load(&self, job_id: JobId) -> Result<Job, JobError> {
        self.store.get(job_id).await?.ok_or(JobError::NotFound(job_id))
    }

    /// Status and, when failed, the error message.
    pub async fn get_status(&self, job_id: JobId) -> Result<JobStatusView, JobError> {
        Ok(self.load(job_id).await?.view())
    }

    /// Location of the accepted-records artifact. Only available once completed.
    pub async fn get_artifact(&self, job_id: JobId) -> Result<PathBuf, JobError> {
        let job = self.load(job_id).await?;
        match (job.status, job.result_path) {
            (JobStatus::Completed, Some(path)) => Ok(path),
            (status, _) => Err(JobError::NotReady { job_id, status }),
        }
    }
}
