//! Job record stores.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io;
use std::path::PathBuf;

use super::artifact::write_atomic;
use super::{Job, JobId};
use crate::errors::StoreError;

/// Durable storage for job records.
///
/// Each `put` replaces the whole record. Writes for one job never
/// interleave with writes for another.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Loads a job, or `None` if it does not exist.
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Inserts or replaces a job.
    async fn put(&self, job: &Job) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, Job>,
}

impl InMemoryJobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if no jobs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }
}

/// One JSON document per job under a directory.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        match tokio::fs::read(self.path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(job)?;
        write_atomic(&self.path(job.id), &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobStatus;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_in_memory_put_replaces() {
        let store = InMemoryJobStore::new();
        let mut job = Job::new("qna");
        assert_ok!(store.put(&job).await);

        job.start().unwrap();
        assert_ok!(store.put(&job).await);

        assert_eq!(store.len(), 1);
        let loaded = store.get(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Processing);
        assert!(store.get(JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(dir.path().join("jobs"));
        let mut job = Job::new("summarization");
        job.start().unwrap();
        job.fail("upload missing").unwrap();

        store.put(&job).await.unwrap();
        let loaded = store.get(job.id).await.unwrap().unwrap();

        assert_eq!(loaded, job);
        assert!(store.get(JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(dir.path());
        let id = JobId::new();
        std::fs::write(dir.path().join(format!("{id}.json")), b"{not json").unwrap();

        let err = assert_err!(store.get(id).await);
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
