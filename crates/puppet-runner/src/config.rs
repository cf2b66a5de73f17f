//! Configuration types for the content generator.
//!
//! All configuration is loaded from environment variables: which LLM backend
//! to call (URL, API key, model), an optional fallback backend, the request
//! deadline and an optional directory of prompt template overrides.

use std::time::Duration;

use crate::error::RunnerError;

/// Default request deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Complete generator configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Primary LLM backend configuration.
    pub primary_backend: LlmBackendConfig,
    /// Backend tried when the primary one fails.
    pub fallback_backend: Option<LlmBackendConfig>,
    /// Maximum time allowed for one LLM call.
    pub request_timeout: Duration,
    /// Directory whose `*.j2` files replace the built-in prompt templates.
    pub templates_dir: Option<String>,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai, anthropic, ollama).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Parse a backend name as written in `LLM_BACKEND`.
    pub fn from_name(name: &str) -> Result<Self, RunnerError> {
        match name.trim().to_lowercase().as_str() {
            "openai" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(RunnerError::Config(format!("unknown backend type: {other}"))),
        }
    }
}

impl RunnerConfig {
    /// Configuration with a single backend and defaults for everything else.
    pub const fn new(primary_backend: LlmBackendConfig) -> Self {
        Self {
            primary_backend,
            fallback_backend: None,
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            templates_dir: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `LLM_BACKEND` -- backend type (`openai`, `deepseek`, `ollama`, `anthropic`)
    /// - `LLM_API_URL` -- API base URL
    /// - `LLM_API_KEY` -- API key
    /// - `LLM_MODEL` -- model name
    ///
    /// Optional variables:
    /// - `LLM_FALLBACK_BACKEND`, `LLM_FALLBACK_API_URL`, `LLM_FALLBACK_API_KEY`,
    ///   `LLM_FALLBACK_MODEL` -- fallback backend, used only when all four are set
    /// - `LLM_TIMEOUT_MS` -- request deadline in milliseconds (default 20000)
    /// - `TEMPLATES_DIR` -- directory of prompt template overrides
    pub fn from_env() -> Result<Self, RunnerError> {
        let primary_backend = load_backend_config("LLM")?;
        let fallback_backend = load_backend_config("LLM_FALLBACK").ok();

        let timeout_ms: u64 = std::env::var("LLM_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid LLM_TIMEOUT_MS: {e}")))?;

        let templates_dir = std::env::var("TEMPLATES_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty());

        Ok(Self {
            primary_backend,
            fallback_backend,
            request_timeout: Duration::from_millis(timeout_ms),
            templates_dir,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RunnerError> {
    std::env::var(name)
        .map_err(|e| RunnerError::Config(format!("missing required env var {name}: {e}")))
}

/// Load an LLM backend config from a set of prefixed environment variables.
fn load_backend_config(prefix: &str) -> Result<LlmBackendConfig, RunnerError> {
    let backend_type = BackendType::from_name(&env_var(&format!("{prefix}_BACKEND"))?)?;
    let api_url = env_var(&format!("{prefix}_API_URL"))?;
    let api_key = env_var(&format!("{prefix}_API_KEY"))?;
    let model = env_var(&format!("{prefix}_MODEL"))?;

    Ok(LlmBackendConfig {
        backend_type,
        api_url: api_url.trim_end_matches('/').to_owned(),
        api_key,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names() {
        assert_eq!(BackendType::from_name("OpenAI").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::from_name("ollama").ok(), Some(BackendType::OpenAi));
        assert_eq!(BackendType::from_name(" claude ").ok(), Some(BackendType::Anthropic));
        assert!(matches!(
            BackendType::from_name("gemini"),
            Err(RunnerError::Config(_))
        ));
    }

    #[test]
    fn single_backend_defaults() {
        let config = RunnerConfig::new(LlmBackendConfig {
            backend_type: BackendType::OpenAi,
            api_url: "http://localhost:11434/v1".to_owned(),
            api_key: "unused".to_owned(),
            model: "llama3".to_owned(),
        });
        assert!(config.fallback_backend.is_none());
        assert!(config.templates_dir.is_none());
        assert_eq!(config.request_timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }
}
