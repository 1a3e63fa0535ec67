//! Upload storage: the files a job was submitted with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};

use super::artifact::write_atomic;
use super::JobId;
use crate::core::InputFile;
use crate::errors::UploadError;

/// Keeps uploaded files until the job that owns them is processed.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Stores the files submitted with a job.
    async fn save(&self, job_id: JobId, files: &[InputFile]) -> Result<(), UploadError>;

    /// Reconstructs the files for a job.
    async fn load(&self, job_id: JobId) -> Result<Vec<InputFile>, UploadError>;
}

/// Files under `{upload_dir}/{job_id}/`.
///
/// Each upload is stored as `{index:04}-{filename}` so repeated names do not
/// collide. `manifest.json` lists the uploads in submission order and is
/// written last; a job directory without it is treated as missing.
#[derive(Debug, Clone)]
pub struct FsUploadStore {
    root: PathBuf,
}

const MANIFEST: &str = "manifest.json";

/// One submitted file: its original name and where its bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManifestEntry {
    filename: String,
    stored_as: String,
}

impl FsUploadStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding a job's uploads.
    #[must_use]
    pub fn job_dir(&self, job_id: JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }
}

/// Accepts plain file names only.
fn checked_name(filename: &str) -> Result<&str, UploadError> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(UploadError::InvalidFilename(filename.to_string())),
    }
}

#[async_trait]
impl UploadStore for FsUploadStore {
    async fn save(&self, job_id: JobId, files: &[InputFile]) -> Result<(), UploadError> {
        let manifest = files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let name = checked_name(&file.filename)?;
                Ok(ManifestEntry {
                    filename: name.to_string(),
                    stored_as: format!("{index:04}-{name}"),
                })
            })
            .collect::<Result<Vec<_>, UploadError>>()?;

        let dir = self.job_dir(job_id);
        tokio::fs::create_dir_all(&dir).await?;
        for (entry, file) in manifest.iter().zip(files) {
            tokio::fs::write(dir.join(&entry.stored_as), &file.content).await?;
        }
        write_atomic(&dir.join(MANIFEST), &serde_json::to_vec_pretty(&manifest)?).await?;

        tracing::debug!(job_id = %job_id, files = files.len(), dir = %dir.display(), "Saved uploads");
        Ok(())
    }

    async fn load(&self, job_id: JobId) -> Result<Vec<InputFile>, UploadError> {
        let dir = self.job_dir(job_id);
        let manifest: Vec<ManifestEntry> = match tokio::fs::read(dir.join(MANIFEST)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(UploadError::Missing { job_id });
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::with_capacity(manifest.len());
        for entry in manifest {
            let stored_as = checked_name(&entry.stored_as)?;
            let content = tokio::fs::read(dir.join(stored_as)).await?;
            files.push(InputFile::new(entry.filename, content));
        }
        Ok(files)
    }
}
