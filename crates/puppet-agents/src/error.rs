//! Error types for the puppet-agents crate.
//!
//! Loading and validating agent definitions can fail; state mutations cannot
//! (they clamp and prune instead), so the hierarchy is small.

use std::path::PathBuf;

/// Errors that can occur while building or validating agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An agent definition is missing a required field or holds an
    /// out-of-range value.
    #[error("invalid configuration for agent {agent}: {reason}")]
    Configuration {
        /// Agent id, or the file name when the id itself is missing.
        agent: String,
        /// What is wrong with the definition.
        reason: String,
    },

    /// An agent definition file could not be read.
    #[error("failed to read agent file {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An agent definition file is not valid JSON for the schema.
    #[error("failed to parse agent file {path}: {source}")]
    Json {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

impl AgentError {
    /// Shorthand for a [`AgentError::Configuration`] error.
    pub fn configuration(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            agent: agent.into(),
            reason: reason.into(),
        }
    }
}
