//! Pipeline execution.
//!
//! This module provides:
//! - The four-stage dataset [`Pipeline`] (parse, generate, aggregate, quality control)
//! - [`BoundedTaskPool`] for order-preserving, bounded fan-out
//! - [`aggregate`] for dropping failed outcomes

mod fanout;
mod orchestrator;

pub use fanout::BoundedTaskPool;
pub use orchestrator::{aggregate, Pipeline};
