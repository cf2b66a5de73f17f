//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop startup, so `main`
//! can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: puppet_core::ConfigError,
    },

    /// The agent directory could not be read.
    #[error("agent loading error: {source}")]
    Agents {
        /// The underlying agent error.
        #[from]
        source: puppet_agents::AgentError,
    },

    /// The content generator could not be built.
    #[error("content generator error: {source}")]
    Generator {
        /// The underlying runner error.
        #[from]
        source: puppet_runner::RunnerError,
    },

    /// Logging could not be initialized.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },

    /// Observer API server failed.
    #[error("observer error: {message}")]
    Observer {
        /// Description of the observer failure.
        message: String,
    },
}
