//! Chunks, generated records and the run result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An uploaded file handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Original filename; its extension picks the parser.
    pub filename: String,
    /// Raw bytes.
    pub content: Vec<u8>,
}

impl InputFile {
    /// Creates a new input file.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkOrigin {
    /// Source filename.
    pub file: String,
    /// Index of the chunk within its file.
    pub index: usize,
    /// Index of the chunk across the whole run, in submission order.
    pub position: usize,
}

impl ChunkOrigin {
    /// Creates a new origin.
    #[must_use]
    pub fn new(file: impl Into<String>, index: usize, position: usize) -> Self {
        Self {
            file: file.into(),
            index,
            position,
        }
    }
}

/// A unit of source text submitted to generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk text.
    pub text: String,
    /// Provenance.
    pub origin: ChunkOrigin,
}

/// A structured object produced from one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRecord {
    /// The object as returned by the model.
    pub data: Value,
    /// The chunk that produced it.
    pub origin: ChunkOrigin,
}

impl GeneratedRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(data: Value, origin: ChunkOrigin) -> Self {
        Self { data, origin }
    }
}

/// A record that failed the quality gate, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// The rejected record.
    #[serde(flatten)]
    pub record: GeneratedRecord,
    /// Why the gate rejected it.
    pub reason: String,
}

impl RejectedRecord {
    /// Creates a new rejected record.
    #[must_use]
    pub fn new(record: GeneratedRecord, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
        }
    }
}

/// Counters describing one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files received.
    pub files: usize,
    /// Chunks produced by parsing.
    pub chunks: usize,
    /// Chunks that produced a record.
    pub succeeded: usize,
    /// Chunks whose generation failed.
    pub failed: usize,
    /// Records that passed the quality gate.
    pub accepted: usize,
    /// Records that failed the quality gate.
    pub rejected: usize,
}

/// Output of one orchestrator execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Records that passed the quality gate, in chunk order.
    pub accepted: Vec<GeneratedRecord>,
    /// Records that failed the quality gate, in chunk order.
    pub rejected: Vec<RejectedRecord>,
    /// Human-readable progress messages.
    pub messages: Vec<String>,
    /// Run counters.
    pub stats: RunStats,
}

impl RunResult {
    /// The accepted objects without provenance, as written to the artifact.
    pub fn accepted_data(&self) -> impl Iterator<Item = &Value> {
        self.accepted.iter().map(|r| &r.data)
    }
}
