//! Job lifecycle manager: drives one job from `PENDING` to a terminal state.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::{ArtifactPaths, ArtifactWriter, Job, JobId, JobStore, TaskQueue, UploadStore};
use crate::config::JobConfig;
use crate::core::{JobStatus, RunStats};
use crate::errors::{JobError, PipelineError};
use crate::generation::BackoffPolicy;
use crate::pipeline::Pipeline;
use crate::recipes::Recipe;

/// Result of one `process` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The job ran and its artifacts were written.
    Completed {
        /// Accepted-records artifact.
        result_path: PathBuf,
        /// Run counters.
        stats: RunStats,
    },
    /// The job failed and a whole-job retry was requested.
    RetryScheduled {
        /// Attempts made so far.
        attempt: u32,
        /// Delay before redelivery.
        delay: Duration,
        /// Failure message.
        error: String,
    },
    /// The job failed permanently.
    Failed {
        /// Failure message.
        error: String,
    },
    /// Duplicate delivery for a completed job. Nothing was changed.
    AlreadyCompleted,
    /// Delivery for a job that has no retries left. Nothing was changed.
    Exhausted,
    /// Duplicate delivery while another worker holds the job. Nothing was changed.
    InFlight,
}

impl ProcessOutcome {
    /// Returns true if no further delivery will change the job.
    #[must_use]
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::RetryScheduled { .. } | Self::InFlight)
    }
}

/// Owns every status change of the jobs it processes.
pub struct JobLifecycleManager {
    store: Arc<dyn JobStore>,
    uploads: Arc<dyn UploadStore>,
    queue: Arc<dyn TaskQueue>,
    pipeline: Pipeline,
    artifacts: ArtifactWriter,
    retries: BackoffPolicy,
    abandon_after: Duration,
}

impl std::fmt::Debug for JobLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLifecycleManager")
            .field("pipeline", &self.pipeline)
            .field("artifacts", &self.artifacts)
            .field("retries", &self.retries)
            .field("abandon_after", &self.abandon_after)
            .finish_non_exhaustive()
    }
}

impl JobLifecycleManager {
    /// Creates a manager.
    ///
    /// A job runs at most `1 + config.max_retries` times, with
    /// `config.retry_delay()` between attempts.
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        uploads: Arc<dyn UploadStore>,
        queue: Arc<dyn TaskQueue>,
        pipeline: Pipeline,
        config: &JobConfig,
    ) -> Self {
        let max_runs = usize::try_from(config.max_retries)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        Self {
            store,
            uploads,
            queue,
            pipeline,
            artifacts: ArtifactWriter::new(&config.results_dir),
            retries: BackoffPolicy::constant(max_runs, config.retry_delay()),
            abandon_after: config.processing_timeout(),
        }
    }

    /// The artifact writer, for locating result files.
    #[must_use]
    pub fn artifacts(&self) -> &ArtifactWriter {
        &self.artifacts
    }

    /// Processes one delivery of `job_id`.
    ///
    /// Safe to call repeatedly: completed, exhausted and in-flight jobs are
    /// left untouched. A `PROCESSING` record older than the configured
    /// processing timeout belongs to a worker that died; it is failed and,
    /// retries permitting, run again. The only error that is not recorded on
    /// the job is a failure to load or persist it.
    pub async fn process(&self, job_id: JobId) -> Result<ProcessOutcome, JobError> {
        let span = tracing::info_span!("job", job_id = %job_id);
        self.process_job(job_id).instrument(span).await
    }

    async fn process_job(&self, job_id: JobId) -> Result<ProcessOutcome, JobError> {
        let mut job = self
            .store
            .get(job_id)
            .await?
            .ok_or(JobError::NotFound(job_id))?;

        if job.status == JobStatus::Processing && self.is_abandoned(&job) {
            let error = "Processing attempt abandoned".to_string();
            job.fail(&error)?;
            self.store.put(&job).await?;
            tracing::warn!(attempts = job.attempts, "Reclaimed abandoned job");
            if !self.retries.allows(attempts(&job)) {
                return Ok(ProcessOutcome::Failed { error });
            }
        }

        match job.status {
            JobStatus::Completed => {
                tracing::info!("Job already completed, ignoring delivery");
                return Ok(ProcessOutcome::AlreadyCompleted);
            }
            JobStatus::Processing => {
                tracing::info!("Job already in flight, ignoring delivery");
                return Ok(ProcessOutcome::InFlight);
            }
            JobStatus::Failed if !self.retries.allows(attempts(&job)) => {
                tracing::info!(attempts = job.attempts, "Job retries exhausted, ignoring delivery");
                return Ok(ProcessOutcome::Exhausted);
            }
            JobStatus::Pending | JobStatus::Failed => {}
        }

        let recipe = match Recipe::parse(&job.recipe) {
            Ok(recipe) => recipe,
            Err(_) if job.status == JobStatus::Failed => return Ok(ProcessOutcome::Exhausted),
            Err(e) => {
                let error = JobError::from(PipelineError::from(e)).to_string();
                job.fail(&error)?;
                self.store.put(&job).await?;
                tracing::warn!(recipe = %job.recipe, %error, "Job rejected before processing");
                return Ok(ProcessOutcome::Failed { error });
            }
        };

        job.start()?;
        self.store.put(&job).await?;
        tracing::info!(recipe = %recipe, attempt = job.attempts, "Job processing started");

        let (paths, stats) = match self.execute(job.id, recipe).await {
            Ok(done) => done,
            Err(error) => return self.handle_failure(job, error).await,
        };

        let mut completed = job.clone();
        completed.complete(paths.accepted.clone(), Some(paths.rejected))?;
        if let Err(error) = self.store.put(&completed).await {
            return self.handle_failure(job, error.into()).await;
        }

        tracing::info!(
            accepted = stats.accepted,
            rejected = stats.rejected,
            failed_chunks = stats.failed,
            "Job completed"
        );
        Ok(ProcessOutcome::Completed {
            result_path: paths.accepted,
            stats,
        })
    }

    fn is_abandoned(&self, job: &Job) -> bool {
        (Utc::now() - job.updated_at)
            .to_std()
            .is_ok_and(|age| age >= self.abandon_after)
    }

    async fn execute(&self, job_id: JobId, recipe: Recipe) -> Result<(ArtifactPaths, RunStats), JobError> {
        let files = self.uploads.load(job_id).await?;
        let result = self.pipeline.run_recipe(files, recipe).await?;
        let paths = self
            .artifacts
            .write(job_id, &result)
            .await
            .map_err(JobError::Artifact)?;
        Ok((paths, result.stats))
    }

    async fn handle_failure(&self, mut job: Job, error: JobError) -> Result<ProcessOutcome, JobError> {
        let message = error.to_string();
        job.fail(&message)?;
        self.store.put(&job).await?;

        if error.is_retryable() && self.retries.allows(attempts(&job)) {
            let delay = self.retries.delay_for(attempts(&job));
            self.queue.retry(job.id, delay, job.attempts).await?;
            tracing::warn!(
                attempt = job.attempts,
                delay_secs = delay.as_secs(),
                error = %message,
                "Job failed, retry scheduled"
            );
            return Ok(ProcessOutcome::RetryScheduled {
                attempt: job.attempts,
                delay,
                error: message,
            });
        }

        tracing::error!(attempts = job.attempts, error = %message, "Job failed permanently");
        Ok(ProcessOutcome::Failed { error: message })
    }
}

fn attempts(job: &Job) -> usize {
    usize::try_from(job.attempts).unwrap_or(usize::MAX)
}
