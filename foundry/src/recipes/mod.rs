//! Recipes: output schemas and the quality gates bound to them.

mod quality;
mod registry;

pub use quality::{QualityGate, Verdict};
pub use registry::{Recipe, RecipeRegistry};
