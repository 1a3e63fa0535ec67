//! Google Gemini provider over the public REST API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{GenerationProvider, GenerationRequest};
use crate::config::GenerationConfig;
use crate::errors::{ConfigError, ProviderError};

/// Calls `models/{model}:generateContent` with JSON output enforced.
#[derive(Clone)]
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiProvider {
    /// Creates a provider from configuration. Requires an API key.
    pub fn new(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::Invalid("GEMINI_API_KEY is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn body(request: &GenerationRequest) -> Value {
        json!({
            "system_instruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.user_prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(&request.response_schema)
            }
        })
    }
}

/// Rewrites a JSON schema into Gemini's schema dialect: upper-case type
/// names, applied through nested properties and items.
fn response_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| {
                let value = match (key.as_str(), value) {
                    ("type", Value::String(name)) => Value::String(name.to_uppercase()),
                    ("properties", Value::Object(properties)) => Value::Object(
                        properties
                            .iter()
                            .map(|(name, property)| (name.clone(), response_schema(property)))
                            .collect(),
                    ),
                    ("items", items) => response_schema(items),
                    _ => value.clone(),
                };
                (key.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>()
            .into(),
        other => other.clone(),
    }
}

fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("HTTP {status}: {}", body.chars().take(300).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        ProviderError::RateLimited(detail)
    } else {
        ProviderError::Other(detail)
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Other(format!("unexpected response envelope: {e}")))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Other("response has no candidates".to_string()))?;

        candidate
            .content
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| {
                ProviderError::Other(format!(
                    "candidate has no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::Recipe;

    #[test]
    fn test_requires_api_key() {
        assert!(GeminiProvider::new(&GenerationConfig::default()).is_err());
        assert!(GeminiProvider::new(&GenerationConfig::default().with_api_key("  ")).is_err());
        assert!(GeminiProvider::new(&GenerationConfig::default().with_api_key("k")).is_ok());
    }

    #[test]
    fn test_endpoint_and_body() {
        let provider =
            GeminiProvider::new(&GenerationConfig::default().with_api_key("k").with_model("m1"))
                .unwrap();
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/m1:generateContent"
        );

        let request = GenerationRequest::for_recipe(Recipe::Qna, "chunk");
        let body = GeminiProvider::body(&request);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["contents"][0]["parts"][0]["text"], request.user_prompt);

        let schema = &body["generationConfig"]["responseSchema"];
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["question"]["type"], "STRING");
        assert_eq!(schema["required"], Recipe::Qna.schema()["required"]);
    }

    #[test]
    fn test_response_schema_rewrites_nested_types() {
        let schema = json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "description": "type names in descriptions stay as written",
                    "items": { "type": "string" }
                }
            },
            "required": ["steps"]
        });

        assert_eq!(
            response_schema(&schema),
            json!({
                "type": "OBJECT",
                "properties": {
                    "steps": {
                        "type": "ARRAY",
                        "description": "type names in descriptions stay as written",
                        "items": { "type": "STRING" }
                    }
                },
                "required": ["steps"]
            })
        );
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, "").is_rate_limited());
        assert!(classify_status(
            StatusCode::FORBIDDEN,
            r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#
        )
        .is_rate_limited());
        assert!(!classify_status(StatusCode::BAD_REQUEST, "bad").is_rate_limited());
    }
}
