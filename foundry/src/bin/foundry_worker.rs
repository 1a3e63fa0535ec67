//! Foundry worker CLI
//!
//! Submits local files as a dataset job and processes it to completion.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use foundry::config::FoundryConfig;
use foundry::core::InputFile;
use foundry::generation::{GeminiProvider, GenerationClient};
use foundry::jobs::{
    submit_job, FileJobStore, FsUploadStore, JobLifecycleManager, JobQuery, LocalTaskQueue,
    ProcessOutcome, Worker,
};
use foundry::observability::{init_tracing, LogFormat};
use foundry::pipeline::Pipeline;
use foundry::recipes::{Recipe, RecipeRegistry};
use foundry::sources::DefaultChunkSource;

#[derive(Parser)]
#[command(name = "foundry-worker")]
#[command(about = "Generate a dataset from documents with an LLM", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit files as one job and run it until it settles
    Run {
        /// Recipe name
        #[arg(short, long, env = "FOUNDRY_RECIPE", default_value = "qna")]
        recipe: String,

        /// Override the chunk fan-out limit
        #[arg(long)]
        concurrency: Option<usize>,

        /// Input files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the available recipes
    Recipes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });
    RecipeRegistry::validate()?;

    match cli.command {
        Commands::Run {
            recipe,
            concurrency,
            files,
        } => run_command(&recipe, concurrency, &files).await,
        Commands::Recipes => {
            for recipe in Recipe::ALL {
                println!("{:<24} {}", recipe.id(), recipe.description());
            }
            Ok(())
        }
    }
}

async fn run_command(recipe: &str, concurrency: Option<usize>, paths: &[PathBuf]) -> Result<()> {
    let mut config = FoundryConfig::from_env()?;
    if let Some(limit) = concurrency {
        config.pipeline.max_concurrency = limit;
    }
    config.validate()?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        let filename = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?
            .to_string_lossy()
            .into_owned();
        files.push(InputFile::new(filename, content));
    }

    let provider = Arc::new(GeminiProvider::new(&config.generation)?);
    let client = GenerationClient::new(provider, &config.generation);
    let pipeline = Pipeline::new(Arc::new(DefaultChunkSource::new()), client, &config.pipeline);

    let store = Arc::new(FileJobStore::new(config.jobs.results_dir.join("jobs")));
    let uploads = Arc::new(FsUploadStore::new(&config.jobs.upload_dir));
    let (queue, receiver) = LocalTaskQueue::new();
    let queue = Arc::new(queue);
    let manager = Arc::new(JobLifecycleManager::new(
        store.clone(),
        uploads.clone(),
        queue.clone(),
        pipeline,
        &config.jobs,
    ));

    let job_id = submit_job(store.as_ref(), uploads.as_ref(), queue.as_ref(), recipe, &files).await?;
    println!("Submitted job {job_id}");

    let mut worker = Worker::new(manager, receiver);
    let outcome = worker.run_until_settled(job_id).await;

    let view = JobQuery::new(store.clone()).get_status(job_id).await?;
    println!("Status: {}", view.status);
    match outcome {
        Some(ProcessOutcome::Completed { result_path, stats }) => {
            println!(
                "Artifact: {} ({} accepted, {} rejected, {} chunks failed)",
                result_path.display(),
                stats.accepted,
                stats.rejected,
                stats.failed
            );
            Ok(())
        }
        _ => {
            let error = view.error.unwrap_or_else(|| "unknown error".to_string());
            anyhow::bail!("job {job_id} failed: {error}")
        }
    }
}
