//! Error types for the foundry pipeline.
//!
//! Failures are split by the level at which they are absorbed: provider and
//! generation errors stay inside a single chunk, pipeline errors are
//! structural input problems, and job errors are what the lifecycle manager
//! persists and retries.

use std::io;
use thiserror::Error;

use crate::jobs::{JobId, JobStatus};

/// The umbrella error type for foundry operations.
#[derive(Debug, Error)]
pub enum FoundryError {
    /// Configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A recipe name did not resolve.
    #[error("{0}")]
    UnknownRecipe(#[from] UnknownRecipeError),

    /// A per-chunk generation failure surfaced directly.
    #[error("{0}")]
    Generation(#[from] GenerationError),

    /// The pipeline rejected its input.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// A job-level failure.
    #[error("{0}")]
    Job(#[from] JobError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Error raised when configuration values are missing or malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// The variable or field name.
        key: String,
        /// The offending raw value.
        value: String,
    },

    /// The configuration is internally inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Error raised when a recipe name is not part of the registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown recipe name: {name}")]
pub struct UnknownRecipeError {
    /// The name that failed to resolve.
    pub name: String,
}

impl UnknownRecipeError {
    /// Creates a new unknown recipe error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raw outcome of a failed call to an LLM provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the call because of rate limits or quota.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The request never produced a response (network, timeout, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other provider-side failure.
    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Returns true if the failure is a rate-limit or quota rejection.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Classified per-chunk generation failure.
///
/// Every variant is terminal for the chunk that produced it; rate-limit
/// retries have already been spent by the time this value exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The recipe does not exist. Raised before any provider call.
    #[error("{0}")]
    UnknownRecipe(#[from] UnknownRecipeError),

    /// Every attempt was rejected by the provider's rate limiter.
    #[error("Generation failed after {attempts} rate-limited attempts")]
    RateLimitExhausted {
        /// Number of attempts made.
        attempts: usize,
    },

    /// The response was not the expected structured object.
    #[error("Malformed model output: {reason}")]
    MalformedOutput {
        /// Why parsing or shape validation failed.
        reason: String,
    },

    /// The call failed in transit.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other non-retryable provider failure.
    #[error("Generation failed: {0}")]
    Provider(String),
}

impl GenerationError {
    /// Creates a malformed output error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }

    /// Short machine-readable classification, used as a log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRecipe(_) => "unknown_recipe",
            Self::RateLimitExhausted { .. } => "rate_limit_exhausted",
            Self::MalformedOutput { .. } => "malformed_output",
            Self::Transport(_) => "transport",
            Self::Provider(_) => "provider",
        }
    }
}

/// Why a single file produced no chunks.
///
/// Never leaves the chunk source; it is logged and the file is skipped.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file is not valid UTF-8 text.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The CSV header or a row could not be read.
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The workbook or its first sheet could not be read.
    #[error("unreadable workbook: {0}")]
    Workbook(String),

    /// A row could not be encoded as JSON.
    #[error("row encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// No parser exists for this file type.
    #[error("no parser for this file type")]
    Unsupported,

    /// The parser panicked.
    #[error("parser aborted: {0}")]
    Aborted(String),
}

/// Structural input errors detected before any generation call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The run was started without files.
    #[error("No input files were provided")]
    NoInputFiles,

    /// The run named a recipe that is not registered.
    #[error("{0}")]
    UnknownRecipe(#[from] UnknownRecipeError),
}

/// Errors from the job record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage IO failed.
    #[error("Job store IO error: {0}")]
    Io(#[from] io::Error),

    /// A job record could not be encoded or decoded.
    #[error("Job record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors reconstructing the uploaded files for a job.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No upload directory exists for the job.
    #[error("No uploads found for job {job_id}")]
    Missing {
        /// The job whose uploads are missing.
        job_id: JobId,
    },

    /// A filename would escape the upload directory.
    #[error("Invalid upload filename: '{0}'")]
    InvalidFilename(String),

    /// The upload manifest could not be encoded or decoded.
    #[error("Upload manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Reading or writing upload bytes failed.
    #[error("Upload IO error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from the task-queue collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue no longer accepts deliveries.
    #[error("Task queue is closed")]
    Closed,
}

/// Job-level failures.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job exists with the given id.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The requested artifact does not exist yet.
    #[error("Job {job_id} is not ready (status: {status})")]
    NotReady {
        /// The job id.
        job_id: JobId,
        /// The job's current status.
        status: JobStatus,
    },

    /// A status change violated the lifecycle state machine.
    #[error("Invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        /// The job id.
        job_id: JobId,
        /// Current status.
        from: JobStatus,
        /// Requested status.
        to: JobStatus,
    },

    /// The pipeline rejected its input.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Uploaded files could not be reconstructed.
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// The job store failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The task queue failed.
    #[error("{0}")]
    Queue(#[from] QueueError),

    /// The result artifact could not be written.
    #[error("Artifact write failed: {0}")]
    Artifact(#[source] io::Error),
}

impl JobError {
    /// Returns true if a whole-job retry could plausibly succeed.
    ///
    /// Unknown recipes and lookup failures never change between attempts.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound(_)
                | Self::NotReady { .. }
                | Self::InvalidTransition { .. }
                | Self::Pipeline(PipelineError::UnknownRecipe(_))
        )
    }
}
