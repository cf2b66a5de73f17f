//! LLM content generation for the Puppet Engine.
//!
//! Implements the engine's [`ContentGenerator`](puppet_core::ContentGenerator)
//! port by prompting an OpenAI-compatible or Anthropic backend over HTTP.
//! The engine never sees free text: answers are parsed and clamped here
//! before they cross the port.
//!
//! # Modules
//!
//! - [`config`] -- Backend selection from environment variables
//! - [`error`] -- Error types ([`RunnerError`])
//! - [`generator`] -- [`LlmContentGenerator`] and its prompt contexts
//! - [`llm`] -- Enum-dispatched HTTP backends
//! - [`parse`] -- JSON and line-prefixed response parsing
//! - [`prompt`] -- `minijinja` prompt templates

pub mod config;
pub mod error;
pub mod generator;
pub mod llm;
pub mod parse;
pub mod prompt;

pub use config::{BackendType, LlmBackendConfig, RunnerConfig};
pub use error::RunnerError;
pub use generator::LlmContentGenerator;
pub use prompt::{PromptEngine, PromptKind, RenderedPrompt, ResponseFormat};
