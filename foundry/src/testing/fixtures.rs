//! A fully wired job system for tests.

use std::path::Path;
use std::sync::Arc;

use crate::config::{FoundryConfig, GenerationConfig, JobConfig};
use crate::core::InputFile;
use crate::errors::JobError;
use crate::generation::{GenerationClient, GenerationProvider};
use crate::jobs::{
    submit_job, FsUploadStore, InMemoryJobStore, JobId, JobLifecycleManager, JobQuery,
    LocalTaskQueue, ProcessOutcome, Worker,
};
use crate::pipeline::Pipeline;
use crate::sources::{ChunkSource, DefaultChunkSource};

/// In-memory job store, filesystem uploads and results, local queue and one worker.
pub struct JobHarness {
    /// Job records.
    pub store: Arc<InMemoryJobStore>,
    /// Uploaded files.
    pub uploads: Arc<FsUploadStore>,
    /// The queue jobs are scheduled on.
    pub queue: Arc<LocalTaskQueue>,
    /// The lifecycle manager the worker drives.
    pub manager: Arc<JobLifecycleManager>,
    /// Status and artifact queries.
    pub query: JobQuery,
    worker: Worker,
}

impl std::fmt::Debug for JobHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHarness").finish_non_exhaustive()
    }
}

impl JobHarness {
    /// Configuration for fast tests: millisecond backoff, immediate job
    /// retries, two retries, directories under `root`.
    #[must_use]
    pub fn test_config(root: &Path) -> FoundryConfig {
        FoundryConfig::new()
            .with_generation(GenerationConfig::default().with_backoff_unit_ms(1))
            .with_jobs(
                JobConfig::default()
                    .with_dirs(root.join("uploads"), root.join("results"))
                    .with_retry_delay_seconds(0)
                    .with_max_retries(2),
            )
    }

    /// Wires a harness under `root` with [`Self::test_config`].
    #[must_use]
    pub fn new(root: &Path, provider: Arc<dyn GenerationProvider>) -> Self {
        Self::with_config(&Self::test_config(root), provider)
    }

    /// Wires a harness from explicit configuration.
    #[must_use]
    pub fn with_config(config: &FoundryConfig, provider: Arc<dyn GenerationProvider>) -> Self {
        Self::with_source(config, Arc::new(DefaultChunkSource::new()), provider)
    }

    /// Wires a harness with a custom chunk source.
    #[must_use]
    pub fn with_source(
        config: &FoundryConfig,
        source: Arc<dyn ChunkSource>,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        let store = Arc::new(InMemoryJobStore::new());
        let uploads = Arc::new(FsUploadStore::new(&config.jobs.upload_dir));
        let (queue, receiver) = LocalTaskQueue::new();
        let queue = Arc::new(queue);

        let client = GenerationClient::new(provider, &config.generation);
        let pipeline = Pipeline::new(source, client, &config.pipeline);
        let manager = Arc::new(JobLifecycleManager::new(
            store.clone(),
            uploads.clone(),
            queue.clone(),
            pipeline,
            &config.jobs,
        ));

        Self {
            query: JobQuery::new(store.clone()),
            worker: Worker::new(manager.clone(), receiver),
            store,
            uploads,
            queue,
            manager,
        }
    }

    /// Submits a job through the public submission path.
    pub async fn submit(&self, recipe: &str, files: &[InputFile]) -> Result<JobId, JobError> {
        submit_job(
            self.store.as_ref(),
            self.uploads.as_ref(),
            self.queue.as_ref(),
            recipe,
            files,
        )
        .await
    }

    /// Runs the worker until `job_id` settles.
    pub async fn settle(&mut self, job_id: JobId) -> Option<ProcessOutcome> {
        self.worker.run_until_settled(job_id).await
    }
}
