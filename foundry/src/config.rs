//! Process-wide configuration.
//!
//! A [`FoundryConfig`] is built once at startup (usually from the
//! environment) and handed to the generation client, pipeline and job
//! lifecycle manager. Nothing reads configuration from globals after that.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoundryConfig {
    /// LLM call settings.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Orchestrator settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Job lifecycle and storage settings.
    #[serde(default)]
    pub jobs: JobConfig,
}

impl FoundryConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the configuration from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("GEMINI_API_KEY") {
            config.generation.api_key = Some(key);
        }
        if let Some(model) = lookup("FOUNDRY_MODEL") {
            config.generation.model = model;
        }
        if let Some(url) = lookup("FOUNDRY_API_BASE_URL") {
            config.generation.api_base_url = url;
        }
        if let Some(raw) = lookup("FOUNDRY_MAX_ATTEMPTS") {
            config.generation.max_attempts = parse_var("FOUNDRY_MAX_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("FOUNDRY_MAX_CONCURRENCY") {
            config.pipeline.max_concurrency = parse_var("FOUNDRY_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(dir) = lookup("FOUNDRY_UPLOAD_DIR") {
            config.jobs.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("FOUNDRY_RESULTS_DIR") {
            config.jobs.results_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("FOUNDRY_JOB_RETRY_DELAY_SECS") {
            config.jobs.retry_delay_seconds = parse_var("FOUNDRY_JOB_RETRY_DELAY_SECS", &raw)?;
        }
        if let Some(raw) = lookup("FOUNDRY_JOB_MAX_RETRIES") {
            config.jobs.max_retries = parse_var("FOUNDRY_JOB_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("FOUNDRY_JOB_PROCESSING_TIMEOUT_SECS") {
            config.jobs.processing_timeout_seconds =
                parse_var("FOUNDRY_JOB_PROCESSING_TIMEOUT_SECS", &raw)?;
        }

        Ok(config)
    }

    /// Checks values that would make the pipeline unable to run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_attempts must be at least 1".to_string(),
            ));
        }
        let timeout = self.generation.request_timeout_seconds;
        if !timeout.is_finite() || timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err() {
            return Err(ConfigError::invalid_value(
                "generation.request_timeout_seconds",
                timeout.to_string(),
            ));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.jobs.processing_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "jobs.processing_timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.jobs.upload_dir == self.jobs.results_dir {
            return Err(ConfigError::Invalid(
                "jobs.upload_dir and jobs.results_dir must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the generation config.
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Sets the pipeline config.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Sets the job config.
    #[must_use]
    pub fn with_jobs(mut self, jobs: JobConfig) -> Self {
        self.jobs = jobs;
        self
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid_value(key, raw))
}

/// Settings for the generation client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL of the provider API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Attempts per chunk before a rate-limited chunk is given up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// One backoff time unit in milliseconds; attempt `n` waits `2^n` units.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// Upper bound on a single backoff wait in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_attempts() -> usize {
    3
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_request_timeout() -> f64 {
    120.0
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            api_base_url: default_api_base_url(),
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl GenerationConfig {
    /// Creates a generation config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum attempts per chunk.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the backoff time unit.
    #[must_use]
    pub fn with_backoff_unit_ms(mut self, unit: u64) -> Self {
        self.backoff_unit_ms = unit;
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Gets the backoff unit as a Duration.
    #[must_use]
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    /// Gets the request timeout as a Duration.
    ///
    /// Values `validate` would reject fall back to the default.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_request_timeout()))
    }
}

/// Settings for the pipeline orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of chunk generations in flight for one job.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    8
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl PipelineConfig {
    /// Sets the fan-out bound.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }
}

/// Settings for job storage and whole-job retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Directory holding one sub-directory of uploads per job.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Directory receiving result artifacts.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Delay before a failed job is redelivered, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    /// Whole-job retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Age after which a `PROCESSING` record is considered abandoned, in seconds.
    #[serde(default = "default_processing_timeout")]
    pub processing_timeout_seconds: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("/tmp/foundry_uploads")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("/tmp/foundry_results")
}

fn default_retry_delay() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_processing_timeout() -> u64 {
    3600
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            results_dir: default_results_dir(),
            retry_delay_seconds: default_retry_delay(),
            max_retries: default_max_retries(),
            processing_timeout_seconds: default_processing_timeout(),
        }
    }
}

impl JobConfig {
    /// Sets both storage directories.
    #[must_use]
    pub fn with_dirs(mut self, upload_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = upload_dir.into();
        self.results_dir = results_dir.into();
        self
    }

    /// Sets the whole-job retry delay.
    #[must_use]
    pub fn with_retry_delay_seconds(mut self, seconds: u64) -> Self {
        self.retry_delay_seconds = seconds;
        self
    }

    /// Sets the whole-job retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the abandoned-attempt threshold.
    #[must_use]
    pub fn with_processing_timeout_seconds(mut self, seconds: u64) -> Self {
        self.processing_timeout_seconds = seconds;
        self
    }

    /// Gets the retry delay as a Duration.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// Gets the abandoned-attempt threshold as a Duration.
    #[must_use]
    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FoundryConfig::default();
        assert_eq!(config.generation.model, "gemini-1.5-flash");
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.generation.backoff_unit(), Duration::from_secs(1));
        assert_eq!(config.pipeline.max_concurrency, 8);
        assert_eq!(config.jobs.retry_delay(), Duration::from_secs(300));
        assert_eq!(config.jobs.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = FoundryConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("FOUNDRY_MAX_CONCURRENCY", "2"),
            ("FOUNDRY_RESULTS_DIR", "/data/results"),
            ("FOUNDRY_JOB_MAX_RETRIES", "5"),
        ]))
        .unwrap();

        assert_eq!(config.generation.api_key.as_deref(), Some("secret"));
        assert_eq!(config.pipeline.max_concurrency, 2);
        assert_eq!(config.jobs.results_dir, PathBuf::from("/data/results"));
        assert_eq!(config.jobs.max_retries, 5);
        assert_eq!(config.jobs.upload_dir, PathBuf::from("/tmp/foundry_uploads"));
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = FoundryConfig::from_lookup(lookup_from(&[("FOUNDRY_MAX_CONCURRENCY", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "FOUNDRY_MAX_CONCURRENCY"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = FoundryConfig::new().with_pipeline(PipelineConfig::default().with_max_concurrency(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_request_timeout() {
        for bad in [-1.0, 0.0, f64::NAN, f64::INFINITY, 1e300] {
            let mut config = FoundryConfig::new();
            config.generation.request_timeout_seconds = bad;
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "generation.request_timeout_seconds"),
                "{bad}"
            );
            assert_eq!(config.generation.request_timeout(), Duration::from_secs(120));
        }
    }

    #[test]
    fn test_deserialized_negative_timeout_does_not_panic() {
        let config: FoundryConfig =
            serde_json::from_str(r#"{"generation": {"request_timeout_seconds": -5}}"#).unwrap();
        assert!(config.validate().is_err());
        assert_eq!(config.generation.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_processing_timeout() {
        let config = FoundryConfig::from_lookup(lookup_from(&[(
            "FOUNDRY_JOB_PROCESSING_TIMEOUT_SECS",
            "90",
        )]))
        .unwrap();
        assert_eq!(config.jobs.processing_timeout(), Duration::from_secs(90));
        assert_eq!(JobConfig::default().processing_timeout(), Duration::from_secs(3600));

        let zero = FoundryConfig::new().with_jobs(JobConfig::default().with_processing_timeout_seconds(0));
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = GenerationConfig::new().with_api_key("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FoundryConfig =
            serde_json::from_str(r#"{"jobs": {"max_retries": 1}}"#).unwrap();
        assert_eq!(config.jobs.max_retries, 1);
        assert_eq!(config.jobs.retry_delay_seconds, 300);
        assert_eq!(config.generation.max_attempts, 3);
    }
}
