//! Generation client: one chunk in, one structured record or a classified failure out.

use serde_json::Value;
use std::sync::Arc;

use super::{BackoffPolicy, GenerationProvider, GenerationRequest};
use crate::config::GenerationConfig;
use crate::core::Chunk;
use crate::errors::{GenerationError, ProviderError};
use crate::recipes::Recipe;

/// Wraps a provider with recipe resolution, output validation and
/// rate-limit backoff.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn GenerationProvider>,
    backoff: BackoffPolicy,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("provider", &self.provider.name())
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl GenerationClient {
    /// Creates a client from configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerationProvider>, config: &GenerationConfig) -> Self {
        let backoff = BackoffPolicy::exponential(config.max_attempts, config.backoff_unit())
            .with_max_delay(std::time::Duration::from_millis(config.max_backoff_ms));
        Self { provider, backoff }
    }

    /// Creates a client with an explicit backoff policy.
    #[must_use]
    pub fn with_backoff(provider: Arc<dyn GenerationProvider>, backoff: BackoffPolicy) -> Self {
        Self { provider, backoff }
    }

    /// The backoff policy applied to rate-limited calls.
    #[must_use]
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Generates a record for a chunk under a recipe given by name.
    ///
    /// An unknown recipe fails with [`GenerationError::UnknownRecipe`] before
    /// any provider call.
    pub async fn generate(&self, chunk: &str, recipe_name: &str) -> Result<Value, GenerationError> {
        let recipe = Recipe::parse(recipe_name)?;
        self.generate_for(chunk, recipe).await
    }

    /// Generates a record for a chunk under a resolved recipe.
    pub async fn generate_for(&self, chunk: &str, recipe: Recipe) -> Result<Value, GenerationError> {
        let request = GenerationRequest::for_recipe(recipe, chunk);

        for attempt in 0..self.backoff.max_attempts {
            match self.provider.generate(&request).await {
                Ok(text) => return parse_structured(&text, recipe),
                Err(ProviderError::RateLimited(message)) => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::warn!(
                        provider = self.provider.name(),
                        attempt = attempt + 1,
                        max_attempts = self.backoff.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        %message,
                        "Rate limit hit, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ProviderError::Transport(message)) => {
                    return Err(GenerationError::Transport(message));
                }
                Err(ProviderError::Other(message)) => {
                    return Err(GenerationError::Provider(message));
                }
            }
        }

        Err(GenerationError::RateLimitExhausted {
            attempts: self.backoff.max_attempts,
        })
    }

    /// Pipeline-facing call: a record, or `None` after logging the failure.
    pub async fn generate_outcome(&self, chunk: &Chunk, recipe: Recipe) -> Option<Value> {
        match self.generate_for(&chunk.text, recipe).await {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(
                    file = %chunk.origin.file,
                    chunk = chunk.origin.position,
                    kind = error.kind(),
                    %error,
                    "Chunk generation failed"
                );
                None
            }
        }
    }
}

/// Parses a response into an object carrying every required field of the recipe.
pub fn parse_structured(text: &str, recipe: Recipe) -> Result<Value, GenerationError> {
    let value: Value = serde_json::from_str(text.trim())
        .map_err(|e| GenerationError::malformed(format!("invalid JSON: {e}")))?;

    let Some(object) = value.as_object() else {
        return Err(GenerationError::malformed("response is not a JSON object"));
    };
    if let Some(missing) = recipe
        .required_fields()
        .into_iter()
        .find(|field| !object.contains_key(field))
    {
        return Err(GenerationError::malformed(format!(
            "missing required field '{missing}'"
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkOrigin;
    use crate::testing::{qna_reply, ScriptedProvider, ScriptedReply};
    use serde_json::json;
    use std::time::Duration;

    fn client(provider: Arc<ScriptedProvider>) -> GenerationClient {
        GenerationClient::with_backoff(provider, BackoffPolicy::exponential(3, Duration::from_secs(1)))
    }

    #[tokio::test]
    async fn test_success_returns_object() {
        let provider = Arc::new(ScriptedProvider::new().otherwise(qna_reply(
            "What colour is the sky?",
            "The sky is blue.",
        )));
        let record = client(provider.clone())
            .generate("The sky is blue.", "qna")
            .await
            .unwrap();

        assert_eq!(record["question"], "What colour is the sky?");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_recipe_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::new());
        let err = client(provider.clone()).generate("text", "poetry").await.unwrap_err();

        assert!(matches!(err, GenerationError::UnknownRecipe(ref e) if e.name == "poetry"));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_backoff_is_one_two_four_units() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(ScriptedReply::Fail(ProviderError::RateLimited("quota".into()))),
        );
        let start = tokio::time::Instant::now();

        let err = client(provider.clone()).generate("text", "qna").await.unwrap_err();

        assert_eq!(err, GenerationError::RateLimitExhausted { attempts: 3 });
        assert_eq!(provider.call_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(1 + 2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let provider = Arc::new(ScriptedProvider::new().on_chunk(
            "text",
            vec![
                ScriptedReply::Fail(ProviderError::RateLimited("429".into())),
                qna_reply("What is in the text?", "Some useful content."),
            ],
        ));
        let start = tokio::time::Instant::now();

        let record = client(provider.clone()).generate("text", "qna").await.unwrap();

        assert_eq!(record["answer"], "Some useful content.");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_malformed_output_is_not_retried() {
        let provider = Arc::new(
            ScriptedProvider::new().otherwise(ScriptedReply::Raw("Sure! Here is JSON: {".into())),
        );
        let err = client(provider.clone()).generate("text", "qna").await.unwrap_err();

        assert!(matches!(err, GenerationError::MalformedOutput { .. }));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(ScriptedReply::Fail(ProviderError::Transport("reset".into()))),
        );
        let err = client(provider.clone()).generate("text", "qna").await.unwrap_err();

        assert_eq!(err, GenerationError::Transport("reset".into()));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_outcome_absorbs_failures() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .otherwise(ScriptedReply::Fail(ProviderError::Other("boom".into()))),
        );
        let chunk = Chunk {
            text: "text".into(),
            origin: ChunkOrigin::new("a.txt", 0, 0),
        };
        assert!(client(provider).generate_outcome(&chunk, Recipe::Qna).await.is_none());
    }

    #[test]
    fn test_parse_structured_shapes() {
        assert!(parse_structured(r#"{"question": "q?", "answer": "a"}"#, Recipe::Qna).is_ok());
        assert!(parse_structured("  {\"question\": \"q\", \"answer\": \"a\"}\n", Recipe::Qna).is_ok());
        assert!(matches!(
            parse_structured(r#"["question", "answer"]"#, Recipe::Qna),
            Err(GenerationError::MalformedOutput { .. })
        ));
        let err = parse_structured(r#"{"question": "q"}"#, Recipe::Qna).unwrap_err();
        assert!(err.to_string().contains("answer"));
        assert_eq!(
            parse_structured(r#"{"summary": "s", "original_text_preview": "p", "extra": 1}"#, Recipe::Summarization)
                .unwrap()["extra"],
            json!(1)
        );
    }
}
