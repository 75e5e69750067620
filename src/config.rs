//! Configuration management for the research worker.
//!
//! Configuration can be set via environment variables:
//! - `CEREBRAS_API_KEY` - Required per request. Completion service API key.
//! - `PARALLEL_API_KEY` - Required per request. Search service API key.
//! - `CEREBRAS_BASE_URL` - Optional. Defaults to `https://api.cerebras.ai/v1`.
//! - `PARALLEL_BASE_URL` - Optional. Defaults to `https://api.parallel.ai`.
//! - `RESEARCH_MODEL` - Optional. Completion model. Defaults to `llama-3.3-70b`.
//! - `RESEARCH_MODE` - Optional. `buffered` or `streaming`. Defaults to `buffered`.
//! - `MAX_STEPS` - Optional. Maximum orchestration rounds. Defaults to `10`.
//! - `MAX_RETRIES` - Optional. Completion retries on transient failure. Defaults to `2`.
//! - `TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.1`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `8787`.
//!
//! The two API keys are not checked at start-up: a missing key is reported on
//! every research request as a 500 naming the variable.

use std::str::FromStr;

use thiserror::Error;

pub const COMPLETION_KEY_VAR: &str = "CEREBRAS_API_KEY";
pub const SEARCH_KEY_VAR: &str = "PARALLEL_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Which response transport the research endpoint uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchMode {
    /// Run to completion, respond with the answer text
    Buffered,
    /// Respond with a server-sent event stream
    Streaming,
}

impl ResearchMode {
    /// Per-result character budget handed to the search tool.
    pub fn max_chars_per_result(self) -> usize {
        match self {
            Self::Buffered => 2000,
            Self::Streaming => 800,
        }
    }
}

impl FromStr for ResearchMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "buffered" => Ok(Self::Buffered),
            "streaming" => Ok(Self::Streaming),
            other => Err(format!("expected `buffered` or `streaming`, got: {}", other)),
        }
    }
}

/// API credentials, present only once both keys are configured.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub completion_api_key: String,
    pub search_api_key: String,
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cerebras API key
    pub completion_api_key: Option<String>,

    /// Parallel API key
    pub search_api_key: Option<String>,

    /// OpenAI-compatible base URL of the completion service
    pub completion_base_url: String,

    /// Base URL of the search service
    pub search_base_url: String,

    /// Completion model identifier
    pub model: String,

    /// Buffered or streaming transport
    pub mode: ResearchMode,

    /// Maximum orchestration rounds per request
    pub max_steps: usize,

    /// Completion retries on transient failure
    pub max_retries: u32,

    pub temperature: f32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if an optional variable is set but
    /// cannot be parsed. Missing API keys are not an error here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(env_opt(COMPLETION_KEY_VAR), env_opt(SEARCH_KEY_VAR));

        if let Some(url) = env_opt("CEREBRAS_BASE_URL") {
            config.completion_base_url = url;
        }
        if let Some(url) = env_opt("PARALLEL_BASE_URL") {
            config.search_base_url = url;
        }
        if let Some(model) = env_opt("RESEARCH_MODEL") {
            config.model = model;
        }
        if let Some(host) = env_opt("HOST") {
            config.host = host;
        }

        config.mode = parse_env("RESEARCH_MODE", config.mode)?;
        config.port = parse_env("PORT", config.port)?;
        config.max_retries = parse_env("MAX_RETRIES", config.max_retries)?;
        config.temperature = parse_env("TEMPERATURE", config.temperature)?;
        config.max_steps = parse_env("MAX_STEPS", config.max_steps)?;
        if config.max_steps == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_STEPS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// Create a config with defaults and the given keys (useful for testing).
    pub fn new(completion_api_key: Option<String>, search_api_key: Option<String>) -> Self {
        Self {
            completion_api_key,
            search_api_key,
            completion_base_url: "https://api.cerebras.ai/v1".to_string(),
            search_base_url: "https://api.parallel.ai".to_string(),
            model: "llama-3.3-70b".to_string(),
            mode: ResearchMode::Buffered,
            max_steps: 10,
            max_retries: 2,
            temperature: 0.1,
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }

    /// Both API keys, or the first missing one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` naming the completion key first,
    /// then the search key.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let completion_api_key = self
            .completion_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar(COMPLETION_KEY_VAR.to_string()))?;
        let search_api_key = self
            .search_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvVar(SEARCH_KEY_VAR.to_string()))?;

        Ok(Credentials {
            completion_api_key,
            search_api_key,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue(key.to_string(), format!("{}", e)))
}
