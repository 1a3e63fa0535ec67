//! # Foundry
//!
//! Turns uploaded documents into schema-conformant, quality-gated datasets
//! generated by an LLM, tracked as background jobs.
//!
//! A job moves through a four-stage pipeline:
//!
//! - **Parse**: each uploaded file is split into text chunks by file type
//! - **Generate**: every chunk is sent to the LLM concurrently, with
//!   rate-limit backoff; a failed chunk is dropped, never the job
//! - **Aggregate**: successful outcomes are collected in chunk order
//! - **Quality control**: the recipe's rules split records into accepted
//!   and rejected
//!
//! The [`jobs::JobLifecycleManager`] owns the job state machine around that
//! pipeline: status persistence, artifact writing and whole-job retries.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use foundry::prelude::*;
//!
//! let config = FoundryConfig::from_env()?;
//! let client = GenerationClient::new(Arc::new(GeminiProvider::new(&config.generation)?), &config.generation);
//! let pipeline = Pipeline::new(Arc::new(DefaultChunkSource::new()), client, &config.pipeline);
//!
//! let result = pipeline.run(vec![InputFile::new("notes.md", bytes)], "qna").await?;
//! for message in &result.messages {
//!     println!("{message}");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod generation;
pub mod jobs;
pub mod observability;
pub mod pipeline;
pub mod recipes;
pub mod sources;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{FoundryConfig, GenerationConfig, JobConfig, PipelineConfig};
    pub use crate::core::{
        Chunk, ChunkOrigin, GeneratedRecord, InputFile, JobStatus, RejectedRecord, RunResult,
        RunStats,
    };
    pub use crate::errors::{
        FoundryError, GenerationError, JobError, PipelineError, ProviderError,
        UnknownRecipeError,
    };
    #[cfg(feature = "gemini")]
    pub use crate::generation::GeminiProvider;
    pub use crate::generation::{BackoffPolicy, GenerationClient, GenerationProvider};
    pub use crate::jobs::{
        submit_job, FsUploadStore, InMemoryJobStore, Job, JobId, JobLifecycleManager, JobQuery,
        JobStore, LocalTaskQueue, ProcessOutcome, TaskQueue, UploadStore, Worker,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::Pipeline;
    pub use crate::recipes::{QualityGate, Recipe, Verdict};
    pub use crate::sources::{ChunkSource, DefaultChunkSource};
}
