//! Shared type definitions for the Puppet Engine.
//!
//! This crate is the single source of truth for the data exchanged between
//! the engine, its collaborators (content generator, social platform) and the
//! monitoring surface. Types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- String keys for agents and posts, UUID wrappers for events and memories
//! - [`persona`] -- Personality and style guide
//! - [`behavior`] -- Posting cadence, interaction probabilities, content preferences
//! - [`mood`] -- PAD emotional state
//! - [`memory`] -- Memory items
//! - [`relationship`] -- Directed relationships and interaction records
//! - [`event`] -- Dispatched events
//! - [`post`] -- Platform posts, stimuli and conversation turns
//! - [`content`] -- Typed collaborator results and content requests

pub mod behavior;
pub mod content;
pub mod event;
pub mod ids;
pub mod memory;
pub mod mood;
pub mod persona;
pub mod post;
pub mod relationship;

pub use behavior::{
    BehaviorConfig, BehaviorOverrides, ContentPreferences, InteractionPatterns, PostFrequency,
};
pub use content::{
    ContentRequest, MemoryUpdate, ReactionAction, ReactionDecision, RelationshipUpdate,
};
pub use event::{Event, EventKind, InteractionPrompt};
pub use ids::{AgentId, EventId, MemoryId, PostId};
pub use memory::{MemoryItem, MemoryKind, MemoryOptions};
pub use mood::{Mood, MoodDelta};
pub use persona::{Capitalization, Formatting, Personality, SentenceLength, StyleGuide};
pub use post::{ConversationTurn, Post, PostOptions, Stimulus};
pub use relationship::{InteractionKind, InteractionRecord, Relationship, RelationshipChange};
