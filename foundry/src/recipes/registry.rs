//! The closed set of dataset recipes and their output schemas.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ConfigError, UnknownRecipeError};

/// A dataset recipe: an output schema paired with a quality gate.
///
/// Adding a variant forces a schema, a description and a gate rule set
/// through the exhaustive matches below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    /// Question and answer pairs.
    Qna,
    /// Condensed summaries.
    Summarization,
    /// General instruction / input / output triples.
    InstructionFollowing,
    /// Explanations of source code chunks.
    CodeExplainer,
    /// Instruction-to-code samples.
    CodingAgent,
    /// Step-by-step math solutions.
    MathReasoning,
}

impl Recipe {
    /// Every registered recipe.
    pub const ALL: [Recipe; 6] = [
        Self::Qna,
        Self::Summarization,
        Self::InstructionFollowing,
        Self::CodeExplainer,
        Self::CodingAgent,
        Self::MathReasoning,
    ];

    /// Resolves a recipe from its identifier.
    pub fn parse(name: &str) -> Result<Self, UnknownRecipeError> {
        Self::ALL
            .into_iter()
            .find(|recipe| recipe.id() == name)
            .ok_or_else(|| UnknownRecipeError::new(name))
    }

    /// The identifier used in requests and job records.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Qna => "qna",
            Self::Summarization => "summarization",
            Self::InstructionFollowing => "instruction_following",
            Self::CodeExplainer => "code_explainer",
            Self::CodingAgent => "coding_agent",
            Self::MathReasoning => "math_reasoning",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Qna => "Question & Answer Pairs",
            Self::Summarization => "Summarization",
            Self::InstructionFollowing => "Instruction Following",
            Self::CodeExplainer => "Code Explainer",
            Self::CodingAgent => "Coding Agent",
            Self::MathReasoning => "Math Reasoning",
        }
    }

    /// What the recipe produces.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Qna => "Generates question-answer pairs ideal for chatbots and assistants.",
            Self::Summarization => "Creates a concise summary of the provided text chunk.",
            Self::InstructionFollowing => {
                "Creates a versatile instruction-based dataset for general purpose models."
            }
            Self::CodeExplainer => "Generates explanations for source code chunks.",
            Self::CodingAgent => {
                "Generates instruction-based datasets for training code generation models."
            }
            Self::MathReasoning => "Generates step-by-step reasoning for solving math problems.",
        }
    }

    /// JSON schema every generated record must follow.
    #[must_use]
    pub fn schema(self) -> Value {
        match self {
            Self::Qna => json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "A relevant, clear question that a human would ask based on the text."
                    },
                    "answer": {
                        "type": "string",
                        "description": "A concise and accurate answer to the question, derived directly from the text."
                    }
                },
                "required": ["question", "answer"]
            }),
            Self::Summarization => json!({
                "type": "object",
                "properties": {
                    "summary": {
                        "type": "string",
                        "description": "A brief, highly condensed summary of the key points in the text."
                    },
                    "original_text_preview": {
                        "type": "string",
                        "description": "The first 50 characters of the original text for reference."
                    }
                },
                "required": ["summary", "original_text_preview"]
            }),
            Self::InstructionFollowing => json!({
                "type": "object",
                "properties": {
                    "instruction": {
                        "type": "string",
                        "description": "A clear, actionable instruction that could be used to train a model."
                    },
                    "input": {
                        "type": "string",
                        "description": "The specific input or context for the instruction. Can be empty if not needed."
                    },
                    "output": {
                        "type": "string",
                        "description": "The ideal, high-quality response to the instruction and input."
                    }
                },
                "required": ["instruction", "output"]
            }),
            Self::CodeExplainer => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "The full path of the source file within the repository (e.g., 'src/utils/auth.py')."
                    },
                    "code_chunk": {
                        "type": "string",
                        "description": "A specific, self-contained block of code, like a function or a class, extracted from the source file."
                    },
                    "explanation": {
                        "type": "string",
                        "description": "A detailed, human-readable explanation of what the code_chunk does, its purpose, and its parameters or return values."
                    }
                },
                "required": ["file_path", "code_chunk", "explanation"]
            }),
            Self::CodingAgent => json!({
                "type": "object",
                "properties": {
                    "instruction": {
                        "type": "string",
                        "description": "A high-level, natural language instruction describing the coding task."
                    },
                    "input_context": {
                        "type": "string",
                        "description": "Optional. Relevant existing code, function signatures, or class definitions the generated code interacts with."
                    },
                    "generated_code": {
                        "type": "string",
                        "description": "The complete, high-quality code that correctly fulfills the instruction."
                    }
                },
                "required": ["instruction", "generated_code"]
            }),
            Self::MathReasoning => json!({
                "type": "object",
                "properties": {
                    "problem": {
                        "type": "string",
                        "description": "The full mathematical problem statement, including any variables or constraints."
                    },
                    "category": {
                        "type": "string",
                        "description": "The area of mathematics the problem belongs to (e.g., 'Calculus', 'Linear Algebra')."
                    },
                    "chain_of_thought": {
                        "type": "array",
                        "description": "Each string is a distinct, logical step in the reasoning process, using LaTeX for notation.",
                        "items": { "type": "string" }
                    },
                    "final_answer": {
                        "type": "string",
                        "description": "The final, conclusive answer to the problem, clearly stated."
                    }
                },
                "required": ["problem", "chain_of_thought", "final_answer"]
            }),
        }
    }

    /// Property names the schema marks as required.
    #[must_use]
    pub fn required_fields(self) -> Vec<String> {
        self.schema()
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Checks that the schema is a usable object schema.
    pub fn validate_schema(self) -> Result<(), ConfigError> {
        let schema = self.schema();
        let invalid = |reason: &str| {
            ConfigError::Invalid(format!("recipe '{}' schema {}", self.id(), reason))
        };

        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(invalid("must have type 'object'"));
        }
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("has no properties"))?;
        let required = self.required_fields();
        if required.is_empty() {
            return Err(invalid("has no required fields"));
        }
        if let Some(missing) = required.iter().find(|f| !properties.contains_key(*f)) {
            return Err(invalid(&format!("requires undeclared field '{missing}'")));
        }
        Ok(())
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Recipe {
    type Err = UnknownRecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Startup check over the whole registry.
pub struct RecipeRegistry;

impl RecipeRegistry {
    /// Validates every recipe schema. Call once at process start.
    pub fn validate() -> Result<(), ConfigError> {
        Recipe::ALL.into_iter().try_for_each(Recipe::validate_schema)
    }

    /// Lists the registered identifiers.
    #[must_use]
    pub fn ids() -> Vec<&'static str> {
        Recipe::ALL.into_iter().map(Recipe::id).collect()
    }
}
