//! LLM provider capability.

use async_trait::async_trait;

use super::GenerationRequest;
use crate::errors::ProviderError;

/// One structured-output LLM call.
///
/// Implementations return the raw response text and classify failures;
/// parsing and retry decisions belong to the [`GenerationClient`](super::GenerationClient).
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name, for logs.
    fn name(&self) -> &str;

    /// Issues a single generation call.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
