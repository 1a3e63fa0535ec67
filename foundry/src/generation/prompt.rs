//! Prompt construction for structured generation.

use serde_json::Value;

use crate::recipes::Recipe;

const SYSTEM_INSTRUCTION: &str = "You are an expert data curation assistant. Your task is to generate \
high-quality, structured data from the user-provided text chunk based on the specified recipe.

You must adhere to the following rules:
1.  Base your output *only* on the information present in the text chunk. Do not add any external knowledge.
2.  Your response MUST be a single, valid JSON object that strictly adheres to the provided JSON schema. \
Do not add any extra text or explanations.";

/// One structured-output call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Recipe the output must follow.
    pub recipe: Recipe,
    /// The source chunk.
    pub chunk: String,
    /// Instruction binding the recipe name and schema.
    pub system_instruction: String,
    /// The user turn carrying the chunk.
    pub user_prompt: String,
    /// Schema the response must satisfy.
    pub response_schema: Value,
}

impl GenerationRequest {
    /// Builds the request for a chunk under a recipe.
    #[must_use]
    pub fn for_recipe(recipe: Recipe, chunk: impl Into<String>) -> Self {
        let chunk = chunk.into();
        let schema = recipe.schema();
        let pretty_schema =
            serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());

        Self {
            recipe,
            system_instruction: format!(
                "{SYSTEM_INSTRUCTION}\n\nRECIPE: {}\nJSON SCHEMA:\n{pretty_schema}\n",
                recipe.id()
            ),
            user_prompt: format!("Here is the text chunk:\n\n---\n{chunk}\n---"),
            response_schema: schema,
            chunk,
        }
    }
}
