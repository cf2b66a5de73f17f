//! Scheduling, event dispatch and reaction orchestration for the Puppet
//! Engine.
//!
//! The [`Engine`] ties the agent registry to two collaborator ports: a
//! [`ContentGenerator`] that writes text and judgments, and a [`Platform`]
//! where posts are published. It decides *when* agents post (naturalistic
//! scheduling), *whether* they react (mention detection and probability
//! gates) and *how* their state evolves (memory, mood, relationships).
//!
//! # Modules
//!
//! - [`config`] -- `puppet-config.yaml` loading into [`EngineConfig`]
//! - [`context`] -- Conversation reconstruction above a mention
//! - [`control`] -- Pause / resume / stop flags for the driver loop
//! - [`dispatch`] -- Event delivery and post triggering
//! - [`engine`] -- The [`Engine`], the shared post path and monitoring views
//! - [`error`] -- Error types ([`CoreError`], [`CollaboratorError`])
//! - [`gating`] -- Pure reaction probability gates
//! - [`mention`] -- Direct mention detection
//! - [`poller`] -- Round-robin mention polling
//! - [`ports`] -- Collaborator traits
//! - [`reaction`] -- The reaction pipeline
//! - [`registry`] -- Shared [`AgentRegistry`] with per-agent busy guards
//! - [`runner`] -- The periodic driver loop
//! - [`scheduler`] -- Post time computation and the due-time queue
//! - [`stub`] -- In-memory collaborators for dry runs and tests

pub mod config;
pub mod context;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod gating;
pub mod mention;
pub mod poller;
pub mod ports;
pub mod reaction;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod stub;

pub use config::{ConfigError, EngineConfig};
pub use control::RunControl;
pub use dispatch::DispatchReport;
pub use engine::{
    AgentSummary, AgentView, Engine, EngineStatus, GuardRejection, PostOutcome, PostRequest,
};
pub use error::{CollaboratorError, CoreError};
pub use ports::{ContentGenerator, Platform};
pub use reaction::{ReactionOutcome, ReactionStage};
pub use registry::{AgentHandle, AgentRegistry};
pub use runner::run_engine;
pub use stub::{InMemoryPlatform, StubContentGenerator};
