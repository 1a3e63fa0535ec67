//! Recipe-specific quality gates.
//!
//! A gate classifies each generated record as accepted or rejected. Rule
//! evaluation never fails outward: a record the rules cannot evaluate
//! (missing field, wrong type) is rejected with the evaluation error as
//! its reason.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::Recipe;
use crate::core::{GeneratedRecord, RejectedRecord};

const QNA_MIN_CHARS: usize = 10;
const CODE_EXPLANATION_MIN_CHARS: usize = 30;

/// Outcome of a quality check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    /// The record survives into the dataset.
    Accepted,
    /// The record is kept aside with the reason it failed.
    Rejected(String),
}

impl Verdict {
    /// Returns true if accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// A rule could not be evaluated against a record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleError {
    field: &'static str,
    problem: &'static str,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' {}", self.field, self.problem)
    }
}

fn text_field<'a>(record: &'a Value, field: &'static str) -> Result<&'a str, RuleError> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(RuleError {
            field,
            problem: "is not a string",
        }),
        None => Err(RuleError {
            field,
            problem: "is missing",
        }),
    }
}

type RuleResult = Result<Option<String>, RuleError>;

fn qna_rules(record: &Value) -> RuleResult {
    let question = text_field(record, "question")?;
    let answer = text_field(record, "answer")?;

    if question.chars().count() < QNA_MIN_CHARS {
        return Ok(Some(format!(
            "question shorter than {QNA_MIN_CHARS} characters"
        )));
    }
    if answer.chars().count() < QNA_MIN_CHARS {
        return Ok(Some(format!("answer shorter than {QNA_MIN_CHARS} characters")));
    }
    if answer.to_lowercase().contains("placeholder") {
        return Ok(Some("answer contains placeholder text".to_string()));
    }
    if !question.contains('?') {
        return Ok(Some("question has no question mark".to_string()));
    }
    Ok(None)
}

fn code_explainer_rules(record: &Value) -> RuleResult {
    let explanation = text_field(record, "explanation")?;
    if explanation.chars().count() < CODE_EXPLANATION_MIN_CHARS {
        return Ok(Some(format!(
            "explanation shorter than {CODE_EXPLANATION_MIN_CHARS} characters"
        )));
    }
    Ok(None)
}

/// Quality gate bound to one recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    recipe: Recipe,
}

impl QualityGate {
    /// Creates the gate registered for a recipe.
    #[must_use]
    pub fn for_recipe(recipe: Recipe) -> Self {
        Self { recipe }
    }

    /// The recipe this gate checks.
    #[must_use]
    pub fn recipe(&self) -> Recipe {
        self.recipe
    }

    /// Returns true if the recipe has rules; recipes without rules accept everything.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        matches!(self.recipe, Recipe::Qna | Recipe::CodeExplainer)
    }

    /// Classifies a single record.
    #[must_use]
    pub fn check(&self, record: &Value) -> Verdict {
        let outcome = match self.recipe {
            Recipe::Qna => qna_rules(record),
            Recipe::CodeExplainer => code_explainer_rules(record),
            Recipe::Summarization
            | Recipe::InstructionFollowing
            | Recipe::CodingAgent
            | Recipe::MathReasoning => Ok(None),
        };

        match outcome {
            Ok(None) => Verdict::Accepted,
            Ok(Some(reason)) => Verdict::Rejected(reason),
            Err(e) => {
                tracing::debug!(recipe = %self.recipe, error = %e, "Quality rule could not be evaluated");
                Verdict::Rejected(format!("quality check error: {e}"))
            }
        }
    }

    /// Splits records into accepted and rejected, keeping relative order on both sides.
    #[must_use]
    pub fn partition(
        &self,
        records: Vec<GeneratedRecord>,
    ) -> (Vec<GeneratedRecord>, Vec<RejectedRecord>) {
        let mut accepted = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for record in records {
            match self.check(&record.data) {
                Verdict::Accepted => accepted.push(record),
                Verdict::Rejected(reason) => rejected.push(RejectedRecord::new(record, reason)),
            }
        }

        (accepted, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChunkOrigin;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn qna(question: &str, answer: &str) -> Value {
        json!({ "question": question, "answer": answer })
    }

    fn record(index: usize, data: Value) -> GeneratedRecord {
        GeneratedRecord::new(data, ChunkOrigin::new("doc.txt", index, index))
    }

    #[test]
    fn test_qna_accepts_good_pair() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        let verdict = gate.check(&qna(
            "What colour is the sky?",
            "The sky is blue on a clear day.",
        ));
        assert_eq!(verdict, Verdict::Accepted);
    }

    #[test]
    fn test_qna_rejects_short_fields() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        assert!(!gate.check(&qna("Why?", "Because the text says so.")).is_accepted());
        assert!(!gate.check(&qna("What does the text say?", "Blue.")).is_accepted());
    }

    #[test]
    fn test_qna_length_counts_characters() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        // Nine multi-byte characters plus '?' is exactly ten characters.
        let verdict = gate.check(&qna("ééééééééé?", "ééééééééééé"));
        assert_eq!(verdict, Verdict::Accepted);
    }

    #[test]
    fn test_qna_rejects_placeholder_any_case() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        let verdict = gate.check(&qna(
            "What is the main topic?",
            "This is a PlaceHolder answer.",
        ));
        assert_eq!(
            verdict,
            Verdict::Rejected("answer contains placeholder text".to_string())
        );
    }

    #[test]
    fn test_qna_requires_question_mark() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        let verdict = gate.check(&qna(
            "Describe the main topic",
            "The main topic is distributed systems.",
        ));
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn test_malformed_record_is_rejected_not_raised() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        let verdict = gate.check(&json!({ "question": 42 }));
        match verdict {
            Verdict::Rejected(reason) => assert!(reason.contains("question")),
            Verdict::Accepted => panic!("malformed record must be rejected"),
        }

        let verdict = gate.check(&json!("not an object"));
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn test_code_explainer_threshold() {
        let gate = QualityGate::for_recipe(Recipe::CodeExplainer);
        let short = json!({ "file_path": "a.py", "code_chunk": "def f(): pass", "explanation": "Does nothing." });
        let long = json!({
            "file_path": "a.py",
            "code_chunk": "def f(): pass",
            "explanation": "Defines a function f that takes no arguments and returns None."
        });
        assert!(!gate.check(&short).is_accepted());
        assert!(gate.check(&long).is_accepted());
    }

    #[test]
    fn test_recipes_without_rules_accept_everything() {
        for recipe in [
            Recipe::Summarization,
            Recipe::InstructionFollowing,
            Recipe::CodingAgent,
            Recipe::MathReasoning,
        ] {
            let gate = QualityGate::for_recipe(recipe);
            assert!(!gate.has_rules());
            assert!(gate.check(&json!({})).is_accepted());
            assert!(gate.check(&json!(null)).is_accepted());
        }
    }

    #[test]
    fn test_partition_is_total_disjoint_and_ordered() {
        let gate = QualityGate::for_recipe(Recipe::Qna);
        let good = |n: usize| qna(&format!("What is item number {n}?"), "It is a numbered item.");
        let bad = |_: usize| qna("What is it?", "short");

        let input = vec![
            record(0, good(0)),
            record(1, bad(1)),
            record(2, good(2)),
            record(3, bad(3)),
            record(4, good(4)),
        ];

        let (accepted, rejected) = gate.partition(input);

        assert_eq!(accepted.len() + rejected.len(), 5);
        let accepted_idx: Vec<_> = accepted.iter().map(|r| r.origin.position).collect();
        let rejected_idx: Vec<_> = rejected.iter().map(|r| r.record.origin.position).collect();
        assert_eq!(accepted_idx, vec![0, 2, 4]);
        assert_eq!(rejected_idx, vec![1, 3]);
    }
}
