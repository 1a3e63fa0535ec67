//! Scripted collaborators for exercising the pipeline without a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::generation::{GenerationProvider, GenerationRequest};

/// One canned provider response.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    /// Serialize this value as the response text.
    Json(Value),
    /// Return this text verbatim.
    Raw(String),
    /// Fail with this error.
    Fail(ProviderError),
    /// Wait, then answer with the inner reply.
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    /// Wraps a reply with latency.
    #[must_use]
    pub fn delayed(delay: Duration, reply: ScriptedReply) -> Self {
        Self::Delayed(delay, Box::new(reply))
    }
}

/// A valid `qna` response.
#[must_use]
pub fn qna_reply(question: &str, answer: &str) -> ScriptedReply {
    ScriptedReply::Json(json!({ "question": question, "answer": answer }))
}

#[derive(Debug)]
struct Script {
    needle: String,
    replies: Vec<ScriptedReply>,
    served: usize,
}

/// A provider that answers from a script keyed by chunk contents.
///
/// The first script whose needle occurs in the chunk answers. Its replies
/// are served in order and the last one repeats. Chunks no script matches
/// get the fallback reply, or an `Other` error when there is none.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<Vec<Script>>,
    fallback: Option<ScriptedReply>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    /// Creates a provider with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers chunks containing `needle` with `replies`.
    #[must_use]
    pub fn on_chunk(mut self, needle: impl Into<String>, replies: Vec<ScriptedReply>) -> Self {
        self.scripts.get_mut().push(Script {
            needle: needle.into(),
            replies,
            served: 0,
        });
        self
    }

    /// Answers every unmatched chunk with `reply`.
    #[must_use]
    pub fn otherwise(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Number of `generate` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Chunks received, in call order.
    #[must_use]
    pub fn seen_chunks(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    fn next_reply(&self, chunk: &str) -> Option<ScriptedReply> {
        let mut scripts = self.scripts.lock();
        if let Some(script) = scripts.iter_mut().find(|s| chunk.contains(&s.needle)) {
            if let Some(last) = script.replies.len().checked_sub(1) {
                let reply = script.replies[script.served.min(last)].clone();
                script.served += 1;
                return Some(reply);
            }
        }
        self.fallback.clone()
    }
}

async fn resolve(mut reply: ScriptedReply) -> Result<String, ProviderError> {
    loop {
        match reply {
            ScriptedReply::Json(value) => return Ok(value.to_string()),
            ScriptedReply::Raw(text) => return Ok(text),
            ScriptedReply::Fail(error) => return Err(error),
            ScriptedReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request.chunk.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = match self.next_reply(&request.chunk) {
            Some(reply) => resolve(reply).await,
            None => Err(ProviderError::Other(format!(
                "no scripted reply for chunk '{}'",
                request.chunk
            ))),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
