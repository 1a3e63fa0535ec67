//! Generation: the LLM call behind a recipe-aware, retrying client.
//!
//! This module provides:
//! - The [`GenerationProvider`] capability (one raw structured-output call)
//! - [`GenerationClient`], which resolves recipes, validates output and
//!   backs off on rate limits
//! - Deterministic [`BackoffPolicy`] schedules
//! - A Gemini provider (feature `gemini`)

mod backoff;
mod client;
#[cfg(feature = "gemini")]
mod gemini;
mod prompt;
mod provider;

pub use backoff::{BackoffPolicy, BackoffStrategy};
pub use client::{parse_structured, GenerationClient};
#[cfg(feature = "gemini")]
pub use gemini::GeminiProvider;
pub use prompt::GenerationRequest;
pub use provider::GenerationProvider;
