//! The dataset pipeline: parse, generate, aggregate, quality control.

use std::sync::Arc;
use tracing::Instrument;

use super::BoundedTaskPool;
use crate::config::PipelineConfig;
use crate::core::{Chunk, ChunkOrigin, GeneratedRecord, InputFile, PipelineStage, RunResult, RunStats};
use crate::errors::{ParseError, PipelineError};
use crate::generation::GenerationClient;
use crate::observability::SpanTimer;
use crate::recipes::{QualityGate, Recipe};
use crate::sources::ChunkSource;

/// Drops failed outcomes, preserving the order of the successes.
#[must_use]
pub fn aggregate<T>(outcomes: Vec<Option<T>>) -> Vec<T> {
    outcomes.into_iter().flatten().collect()
}

/// Runs one dataset job end to end, without touching job state.
///
/// Structural problems (no files, unknown recipe) are the only errors.
/// Everything else degrades: an unparseable file yields no chunks, a
/// failed chunk yields no record, and a run can legitimately end with an
/// empty dataset.
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn ChunkSource>,
    client: GenerationClient,
    pool: BoundedTaskPool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("client", &self.client)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(source: Arc<dyn ChunkSource>, client: GenerationClient, config: &PipelineConfig) -> Self {
        Self {
            source,
            client,
            pool: BoundedTaskPool::new(config.max_concurrency),
        }
    }

    /// Runs the pipeline over `files` under the recipe named `recipe_name`.
    pub async fn run(&self, files: Vec<InputFile>, recipe_name: &str) -> Result<RunResult, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::NoInputFiles);
        }
        let recipe = Recipe::parse(recipe_name)?;
        self.run_recipe(files, recipe).await
    }

    /// Runs the pipeline under an already resolved recipe.
    pub async fn run_recipe(&self, files: Vec<InputFile>, recipe: Recipe) -> Result<RunResult, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::NoInputFiles);
        }

        let span = tracing::info_span!("pipeline", recipe = %recipe, files = files.len());
        async move {
            let timer = SpanTimer::start("pipeline");
            let mut messages = Vec::new();
            let mut stats = RunStats {
                files: files.len(),
                ..RunStats::default()
            };

            let chunks = self.parse(files).await;
            stats.chunks = chunks.len();
            let message = format!("Processed {} files into {} chunks.", stats.files, chunks.len());
            tracing::info!(stage = %PipelineStage::Parse, "{message}");
            messages.push(message);

            let outcomes = self.generate(chunks, recipe).await;
            let records = aggregate(outcomes);
            stats.succeeded = records.len();
            stats.failed = stats.chunks - stats.succeeded;
            let message = format!(
                "Generated {} records from {} chunks ({} failed).",
                stats.succeeded, stats.chunks, stats.failed
            );
            tracing::info!(stage = %PipelineStage::Aggregate, "{message}");
            messages.push(message);

            let gate = QualityGate::for_recipe(recipe);
            let (accepted, rejected) = gate.partition(records);
            stats.accepted = accepted.len();
            stats.rejected = rejected.len();
            let message = format!(
                "Quality control: {} accepted, {} rejected.",
                stats.accepted, stats.rejected
            );
            tracing::info!(stage = %PipelineStage::QualityControl, "{message}");
            messages.push(message);
            tracing::debug!(elapsed_ms = timer.elapsed_ms(), "Pipeline run finished");

            Ok(RunResult {
                accepted,
                rejected,
                messages,
                stats,
            })
        }
        .instrument(span)
        .await
    }

    /// Chunks every file in submission order.
    ///
    /// Parsers run on the blocking pool. A parser that panics costs its file
    /// its chunks and nothing else.
    async fn parse(&self, files: Vec<InputFile>) -> Vec<Chunk> {
        let parsing: Vec<_> = files
            .into_iter()
            .map(|file| {
                let source = Arc::clone(&self.source);
                let filename = file.filename.clone();
                let handle =
                    tokio::task::spawn_blocking(move || source.chunk(&file.content, &file.filename));
                (filename, handle)
            })
            .collect();

        let mut chunks = Vec::new();
        for (filename, handle) in parsing {
            let texts = match handle.await {
                Ok(texts) => texts,
                Err(join_error) => {
                    let error = ParseError::Aborted(join_error.to_string());
                    tracing::warn!(filename = %filename, %error, "Could not parse file, skipping");
                    Vec::new()
                }
            };
            for (index, text) in texts.into_iter().enumerate() {
                let position = chunks.len();
                chunks.push(Chunk {
                    text,
                    origin: ChunkOrigin::new(filename.clone(), index, position),
                });
            }
        }
        chunks
    }

    /// One generation task per chunk, bounded by the pool.
    async fn generate(&self, chunks: Vec<Chunk>, recipe: Recipe) -> Vec<Option<GeneratedRecord>> {
        tracing::debug!(
            stage = %PipelineStage::Generate,
            chunks = chunks.len(),
            limit = self.pool.limit(),
            "Dispatching generation tasks"
        );
        let client = self.client.clone();
        self.pool
            .run(chunks, move |chunk: Chunk| {
                let client = client.clone();
                async move {
                    let data = client.generate_outcome(&chunk, recipe).await?;
                    Some(GeneratedRecord::new(data, chunk.origin))
                }
            })
            .await
    }
}
