//! Job record and its lifecycle transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::JobStatus;
use crate::errors::JobError;

/// Opaque, externally addressable job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Durable record tracking one dataset-generation request.
///
/// The transition methods keep two fields in step with the status:
/// `result_path` is set only while `COMPLETED`, `error` only while `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier.
    pub id: JobId,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Recipe name as submitted. Not validated until processing.
    pub recipe: String,
    /// Accepted-records artifact.
    pub result_path: Option<PathBuf>,
    /// Rejected-records artifact.
    pub rejected_path: Option<PathBuf>,
    /// Human-readable failure detail.
    pub error: Option<String>,
    /// Processing attempts started so far.
    pub attempts: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Creates a pending job with a fresh id.
    #[must_use]
    pub fn new(recipe: impl Into<String>) -> Self {
        Self::with_id(JobId::new(), recipe)
    }

    /// Creates a pending job with the given id.
    #[must_use]
    pub fn with_id(id: JobId, recipe: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            recipe: recipe.into(),
            result_path: None,
            rejected_path: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, to: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(to) {
            return Err(JobError::InvalidTransition {
                job_id: self.id,
                from: self.status,
                to,
            });
        }
        tracing::debug!(job_id = %self.id, from = %self.status, %to, "Job transition");
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Enters `PROCESSING` and counts the attempt.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Processing)?;
        self.attempts += 1;
        self.error = None;
        Ok(())
    }

    /// Enters `COMPLETED` with the artifact locations.
    pub fn complete(&mut self, result_path: PathBuf, rejected_path: Option<PathBuf>) -> Result<(), JobError> {
        self.transition(JobStatus::Completed)?;
        self.result_path = Some(result_path);
        self.rejected_path = rejected_path;
        self.error = None;
        Ok(())
    }

    /// Enters `FAILED` with a message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.result_path = None;
        self.rejected_path = None;
        self.error = Some(error.into());
        Ok(())
    }

    /// The externally visible status.
    #[must_use]
    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            status: self.status,
            error: self.error.clone(),
        }
    }
}

/// What the query surface reports for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatusView {
    /// Current status.
    pub status: JobStatus,
    /// Failure detail, present only when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
