//! Newline-delimited JSON result artifacts.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

use super::JobId;
use crate::core::RunResult;

/// Writes `bytes` to `path` so readers never observe a partial file.
///
/// The content goes to a sibling temporary file first, which is then renamed
/// over the destination.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    tokio::fs::create_dir_all(parent).await?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy();
    let temp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    tokio::fs::write(&temp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

/// Serializes items as one JSON document per line.
pub fn to_ndjson<'a, T, I>(items: I) -> Result<Vec<u8>, serde_json::Error>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out = Vec::new();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.push(b'\n');
    }
    Ok(out)
}

/// Artifact locations written for a completed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Accepted records.
    pub accepted: PathBuf,
    /// Rejected records with reasons.
    pub rejected: PathBuf,
}

/// Writes job artifacts under a results directory at paths derived from the job id.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    results_dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer rooted at `results_dir`.
    #[must_use]
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// `{results_dir}/{job_id}.jsonl`
    #[must_use]
    pub fn accepted_path(&self, job_id: JobId) -> PathBuf {
        self.results_dir.join(format!("{job_id}.jsonl"))
    }

    /// `{results_dir}/{job_id}.rejected.jsonl`
    #[must_use]
    pub fn rejected_path(&self, job_id: JobId) -> PathBuf {
        self.results_dir.join(format!("{job_id}.rejected.jsonl"))
    }

    /// Writes both artifacts for a run.
    ///
    /// The accepted file holds the bare generated objects. The rejected
    /// file keeps each record's origin and rejection reason.
    pub async fn write(&self, job_id: JobId, result: &RunResult) -> io::Result<ArtifactPaths> {
        let paths = ArtifactPaths {
            accepted: self.accepted_path(job_id),
            rejected: self.rejected_path(job_id),
        };

        let rejected = to_ndjson(&result.rejected).map_err(io::Error::other)?;
        write_atomic(&paths.rejected, &rejected).await?;

        let accepted = to_ndjson(result.accepted_data()).map_err(io::Error::other)?;
        write_atomic(&paths.accepted, &accepted).await?;

        tracing::info!(
            job_id = %job_id,
            path = %paths.accepted.display(),
            accepted = result.accepted.len(),
            rejected = result.rejected.len(),
            "Wrote job artifacts"
        );
        Ok(paths)
    }
}
