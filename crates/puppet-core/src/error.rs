//! Error types for the puppet-core crate.
//!
//! Guard rejections and busy agents are ordinary outcomes
//! ([`PostOutcome`](crate::engine::PostOutcome)), not errors. Errors are
//! reserved for unknown agents and failing collaborators.

use puppet_agents::AgentError;
use puppet_types::AgentId;

/// Failure reported by an external collaborator.
///
/// The engine treats every variant the same way: log it, produce no side
/// effect and, for scheduled posts, retry after a fallback interval.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The content generator failed or produced unusable output.
    #[error("content generation failed: {0}")]
    ContentGeneration(String),

    /// The social platform rejected or failed a call.
    #[error("platform call failed: {0}")]
    Platform(String),
}

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No agent with the given id is registered.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// A collaborator call failed.
    #[error("{source}")]
    Collaborator {
        /// The underlying collaborator failure.
        #[from]
        source: CollaboratorError,
    },

    /// An agent definition was invalid.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}
