//! Testing utilities for foundry pipelines and jobs.
//!
//! This module provides:
//! - A scripted LLM provider with call and concurrency tracking
//! - A wired job system over temporary directories

mod fixtures;
mod mocks;

pub use fixtures::JobHarness;
pub use mocks::{qna_reply, ScriptedProvider, ScriptedReply};
