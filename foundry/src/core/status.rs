//! Job status and pipeline stage enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable status of a dataset-generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Submitted, not yet picked up by a worker.
    #[default]
    Pending,
    /// A worker is running the pipeline.
    Processing,
    /// The result artifact has been written.
    Completed,
    /// The last attempt failed.
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl JobStatus {
    /// Returns true if the status ends an attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    ///
    /// `Failed -> Processing` is a whole-job retry; whether retries remain is
    /// decided by the lifecycle manager, not here.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Failed, Self::Processing)
        )
    }
}

/// The four orchestrator stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Files to chunks.
    Parse,
    /// Chunks to generation outcomes.
    Generate,
    /// Outcomes to records.
    Aggregate,
    /// Records to accepted / rejected.
    QualityControl,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Generate => write!(f, "generate"),
            Self::Aggregate => write!(f, "aggregate"),
            Self::QualityControl => write!(f, "quality_control"),
        }
    }
}
