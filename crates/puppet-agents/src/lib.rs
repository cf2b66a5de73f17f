//! Agent state and persona logic for the Puppet Engine.
//!
//! This crate contains everything that operates on agent state without
//! touching I/O beyond reading definition files. It sits between
//! `puppet-types` (the data structures) and `puppet-core` (scheduling,
//! dispatch and reaction orchestration).
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] aggregate and its serializable [`AgentState`]
//! - [`behavior`] -- Per-action [`EffectiveBehavior`] derived from config and overrides
//! - [`config`] -- Agent definition files and directory loading
//! - [`error`] -- Error types ([`AgentError`])
//! - [`memory`] -- Bounded four-collection [`MemoryStore`] with term-overlap search
//! - [`mood`] -- Clamped PAD mood updates
//! - [`social`] -- Per-agent [`RelationshipGraph`]
//! - [`variety`] -- Structural variety directives for content requests

pub mod agent;
pub mod behavior;
pub mod config;
pub mod error;
pub mod memory;
pub mod mood;
pub mod social;
pub mod variety;

pub use agent::{Agent, AgentState};
pub use behavior::EffectiveBehavior;
pub use config::{AgentConfig, LoadReport, load_agent_dir, load_agent_file};
pub use error::AgentError;
pub use memory::{MemoryLimits, MemoryMatch, MemoryStore, recorded_post_id};
pub use social::RelationshipGraph;
pub use variety::{LengthBucket, PostStyle, ShapedInstruction, shape_instruction};
