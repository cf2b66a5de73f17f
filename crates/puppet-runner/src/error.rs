//! Error types for the content generation adapter.
//!
//! Uses `thiserror` for typed errors that surface through the generation
//! pipeline: prompt rendering, LLM calls and response parsing. At the port
//! boundary every variant becomes a
//! [`CollaboratorError::ContentGeneration`].

use puppet_core::CollaboratorError;

/// Errors that can occur while generating content.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be parsed into the expected shape.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The backend did not answer before the request deadline.
    #[error("timeout: LLM request exceeded {0} ms")]
    Timeout(u128),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RunnerError> for CollaboratorError {
    fn from(error: RunnerError) -> Self {
        Self::ContentGeneration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_content_generation_failure() {
        let error: CollaboratorError = RunnerError::Timeout(1500).into();
        assert_eq!(
            error,
            CollaboratorError::ContentGeneration(
                "timeout: LLM request exceeded 1500 ms".to_owned()
            )
        );
    }
}
