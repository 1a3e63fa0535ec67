//! Core domain model types for foundry.
//!
//! This module contains the types shared by every stage:
//! - Job status and pipeline stage enums
//! - Input files, chunks and their provenance
//! - Generated / rejected records and the run result

mod record;
mod status;

pub use record::{
    Chunk, ChunkOrigin, GeneratedRecord, InputFile, RejectedRecord, RunResult, RunStats,
};
pub use status::{JobStatus, PipelineStage};
