//! End-to-end tests: submission through worker to artifacts.

#[cfg(test)]
mod tests {
    use crate::core::{InputFile, JobStatus};
    use crate::errors::{JobError, ProviderError};
    use crate::jobs::{JobStore, LocalTaskQueue, ProcessOutcome, TaskQueue, Worker};
    use crate::sources::{ChunkSource, DefaultChunkSource};
    use crate::testing::{qna_reply, JobHarness, ScriptedProvider, ScriptedReply};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn read_lines(path: &std::path::Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_text_file_with_one_rejected_pair() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .on_chunk(
                    "sky",
                    vec![qna_reply("What colour is the sky?", "The sky is blue in daylight.")],
                )
                .on_chunk(
                    "Water",
                    vec![qna_reply("At what temperature does water boil?", "100C.")],
                ),
        );
        let mut harness = JobHarness::new(dir.path(), provider.clone());

        let file = InputFile::new(
            "facts.txt",
            "The sky is blue.\n\nWater boils at 100 degrees at sea level.\n",
        );
        let id = harness.submit("qna", &[file]).await.unwrap();
        assert_eq!(harness.query.get_status(id).await.unwrap().status, JobStatus::Pending);

        let outcome = harness.settle(id).await.unwrap();

        let ProcessOutcome::Completed { result_path, stats } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(stats.chunks, 2);
        assert_eq!((stats.accepted, stats.rejected), (1, 1));
        assert_eq!(provider.call_count(), 2);

        assert_eq!(
            read_lines(&result_path),
            vec![json!({
                "question": "What colour is the sky?",
                "answer": "The sky is blue in daylight."
            })]
        );

        let job = harness.store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(harness.query.get_artifact(id).await.unwrap(), result_path);

        let rejected = read_lines(job.rejected_path.as_ref().unwrap());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0]["origin"]["file"], "facts.txt");
        assert_eq!(rejected[0]["origin"]["index"], 1);
    }

    #[tokio::test]
    async fn test_unknown_recipe_fails_without_generation() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        let mut harness = JobHarness::new(dir.path(), provider.clone());

        let id = harness
            .submit("poetry", &[InputFile::new("poem.txt", "Roses are red.")])
            .await
            .unwrap();
        let outcome = harness.settle(id).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Failed { .. }));
        assert_eq!(provider.call_count(), 0);

        let view = harness.query.get_status(id).await.unwrap();
        assert_eq!(view.status, JobStatus::Failed);
        assert!(view.error.unwrap().contains("poetry"));
        assert!(matches!(
            harness.query.get_artifact(id).await,
            Err(JobError::NotReady { status: JobStatus::Failed, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_only_chunk_completes_empty() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(ScriptedReply::Fail(ProviderError::RateLimited("quota".into()))),
        );
        let mut harness = JobHarness::new(dir.path(), provider.clone());

        let id = harness
            .submit("qna", &[InputFile::new("one.md", "A single paragraph.")])
            .await
            .unwrap();
        let outcome = harness.settle(id).await.unwrap();

        let ProcessOutcome::Completed { result_path, stats } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(provider.call_count(), 3);
        assert_eq!((stats.chunks, stats.succeeded, stats.failed), (1, 0, 1));
        assert_eq!(std::fs::read(&result_path).unwrap(), Vec::<u8>::new());
        assert_eq!(
            harness.query.get_status(id).await.unwrap().status,
            JobStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_completed_job_is_not_reprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(qna_reply("What does the note say?", "It describes the project.")),
        );
        let mut harness = JobHarness::new(dir.path(), provider.clone());

        let id = harness
            .submit("qna", &[InputFile::new("note.txt", "Project notes.")])
            .await
            .unwrap();
        harness.settle(id).await.unwrap();

        let before = harness.store.get(id).await.unwrap().unwrap();
        let path = before.result_path.clone().unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        // Direct re-invocation and a duplicate queue delivery.
        assert_eq!(
            harness.manager.process(id).await.unwrap(),
            ProcessOutcome::AlreadyCompleted
        );
        harness.queue.schedule(id).await.unwrap();
        assert_eq!(harness.settle(id).await, Some(ProcessOutcome::AlreadyCompleted));

        let after = harness.store.get(id).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_job_failure_retries_until_exhausted() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new());
        let mut harness = JobHarness::new(dir.path(), provider.clone());

        let id = harness
            .submit("qna", &[InputFile::new("gone.txt", "Soon deleted.")])
            .await
            .unwrap();
        std::fs::remove_dir_all(harness.uploads.job_dir(id)).unwrap();

        let outcome = harness.settle(id).await.unwrap();

        assert!(matches!(outcome, ProcessOutcome::Failed { .. }));
        let job = harness.store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert!(job.error.unwrap().contains("No uploads found"));
        assert!(job.result_path.is_none());
        assert_eq!(provider.call_count(), 0);

        assert_eq!(
            harness.manager.process(id).await.unwrap(),
            ProcessOutcome::Exhausted
        );
    }

    fn summary(text: &str) -> ScriptedReply {
        ScriptedReply::Json(json!({
            "summary": text,
            "original_text_preview": "preview"
        }))
    }

    #[tokio::test]
    async fn test_mixed_files_follow_submission_order() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .on_chunk("Introduction", vec![summary("notes")])
                .on_chunk("\"ada\"", vec![summary("ada row")])
                .on_chunk("\"grace\"", vec![summary("grace row")])
                .on_chunk("Appendix", vec![summary("appendix")]),
        );
        let mut config = JobHarness::test_config(dir.path());
        config.pipeline.max_concurrency = 1;
        let mut harness = JobHarness::with_config(&config, provider.clone());

        // Filename order is the reverse of submission order.
        let files = [
            InputFile::new("notes.md", "Introduction paragraph."),
            InputFile::new("data.csv", "name,score\nada,10\ngrace,12\n"),
            InputFile::new("brochure.pdf", vec![0x25, 0x50, 0x44, 0x46]),
            InputFile::new("appendix.txt", "Appendix paragraph."),
        ];
        let id = harness.submit("summarization", &files).await.unwrap();
        let outcome = harness.settle(id).await.unwrap();

        let ProcessOutcome::Completed { result_path, stats } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!((stats.files, stats.chunks, stats.accepted), (4, 4, 4));

        let summaries: Vec<_> = read_lines(&result_path)
            .iter()
            .map(|line| line["summary"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(summaries, vec!["notes", "ada row", "grace row", "appendix"]);

        let seen = provider.seen_chunks();
        assert_eq!(seen.len(), 4);
        assert!(seen[0].contains("Introduction paragraph."));
        assert!(seen[1].contains("\"ada\""));
        assert!(seen[2].contains("\"grace\""));
        assert!(seen[3].contains("Appendix paragraph."));
    }

    #[tokio::test]
    async fn test_files_sharing_a_name_are_all_processed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .on_chunk("Monday", vec![summary("monday")])
                .on_chunk("Tuesday", vec![summary("tuesday")]),
        );
        let mut harness = JobHarness::new(dir.path(), provider);

        let files = [
            InputFile::new("notes.txt", "Monday standup notes."),
            InputFile::new("notes.txt", "Tuesday standup notes."),
        ];
        let id = harness.submit("summarization", &files).await.unwrap();
        let outcome = harness.settle(id).await.unwrap();

        let ProcessOutcome::Completed { result_path, stats } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!((stats.files, stats.chunks), (2, 2));
        let summaries: Vec<_> = read_lines(&result_path)
            .iter()
            .map(|line| line["summary"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(summaries, vec!["monday", "tuesday"]);
    }

    struct ExplodingSpreadsheets;

    impl ChunkSource for ExplodingSpreadsheets {
        fn chunk(&self, content: &[u8], filename: &str) -> Vec<String> {
            assert!(!filename.ends_with(".xlsx"), "workbook parser crashed");
            DefaultChunkSource::new().chunk(content, filename)
        }
    }

    #[tokio::test]
    async fn test_crashing_parser_still_settles_job() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::new().otherwise(summary("survivor")));
        let config = JobHarness::test_config(dir.path());
        let mut harness =
            JobHarness::with_source(&config, Arc::new(ExplodingSpreadsheets), provider);

        let files = [
            InputFile::new("hostile.xlsx", "PK not really"),
            InputFile::new("readme.txt", "Plain paragraph."),
        ];
        let id = harness.submit("summarization", &files).await.unwrap();
        let outcome = harness.settle(id).await.unwrap();

        let ProcessOutcome::Completed { stats, .. } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!((stats.files, stats.chunks, stats.accepted), (2, 1, 1));
        assert_eq!(harness.query.get_status(id).await.unwrap().status, JobStatus::Completed);
        assert_eq!(
            harness.manager.process(id).await.unwrap(),
            ProcessOutcome::AlreadyCompleted
        );
    }

    #[tokio::test]
    async fn test_delivery_for_unknown_job_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = JobHarness::new(dir.path(), Arc::new(ScriptedProvider::new()));
        let ghost = crate::jobs::JobId::new();

        harness.queue.schedule(ghost).await.unwrap();

        assert_eq!(harness.settle(ghost).await, None);
        assert!(harness.store.get(ghost).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_worker_runs_until_queue_closes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(qna_reply("What is listed here?", "A list of deliverables.")),
        );
        let harness = JobHarness::new(dir.path(), provider);
        let id = harness
            .submit("qna", &[InputFile::new("list.txt", "Deliverables.")])
            .await
            .unwrap();

        let (queue, receiver) = LocalTaskQueue::new();
        queue.schedule(id).await.unwrap();
        drop(queue);
        Worker::new(harness.manager.clone(), receiver).run().await;

        assert_eq!(
            harness.query.get_status(id).await.unwrap().status,
            JobStatus::Completed
        );
    }
}
