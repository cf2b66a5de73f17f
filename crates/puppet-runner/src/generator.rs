//! [`ContentGenerator`] implementation over LLM backends.
//!
//! Each port call builds a JSON context from the agent snapshot, renders
//! the matching prompt, sends it to the primary backend (falling back to
//! the secondary one on failure) under a deadline, and parses the answer
//! into the typed result the engine expects.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use puppet_agents::{Agent, mood};
use puppet_core::{CollaboratorError, ContentGenerator};
use puppet_types::{
    AgentId, ContentRequest, Event, MemoryKind, MemoryUpdate, Post, ReactionDecision,
    RelationshipUpdate, Stimulus,
};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::llm::{LlmBackend, create_backend};
use crate::parse::{
    clean_post_text, parse_memory_update, parse_reaction, parse_relationship_update,
};
use crate::prompt::{PromptEngine, PromptKind, RenderedPrompt};

/// Recent posts and events shown to the model.
const PROMPT_RECENT_ITEMS: usize = 5;

/// Memories recalled for the text being answered.
const RELEVANT_MEMORY_LIMIT: usize = 3;

/// Minimum search score for a recalled memory.
const RELEVANT_MEMORY_THRESHOLD: f64 = 0.1;

/// Content generator backed by one or two LLM backends.
#[derive(Debug)]
pub struct LlmContentGenerator {
    prompts: PromptEngine,
    primary: LlmBackend,
    fallback: Option<LlmBackend>,
    request_timeout: Duration,
}

impl LlmContentGenerator {
    /// Build the generator from configuration.
    pub fn new(config: &RunnerConfig) -> Result<Self, RunnerError> {
        let prompts = match &config.templates_dir {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::builtin()?,
        };
        Ok(Self {
            prompts,
            primary: create_backend(&config.primary_backend),
            fallback: config.fallback_backend.as_ref().map(create_backend),
            request_timeout: config.request_timeout,
        })
    }

    /// Render, send and return the raw answer.
    async fn ask(
        &self,
        agent: &Agent,
        kind: PromptKind,
        context: &Value,
    ) -> Result<String, RunnerError> {
        let prompt = self.prompts.render(kind, context)?;
        match self.complete_with(&self.primary, &prompt).await {
            Ok(text) => Ok(text),
            Err(error) => {
                let Some(fallback) = &self.fallback else {
                    return Err(error);
                };
                warn!(
                    agent_id = %agent.id,
                    backend = self.primary.name(),
                    error = %error,
                    "Primary LLM backend failed, trying fallback"
                );
                self.complete_with(fallback, &prompt).await
            }
        }
    }

    /// One backend call under the request deadline.
    async fn complete_with(
        &self,
        backend: &LlmBackend,
        prompt: &RenderedPrompt,
    ) -> Result<String, RunnerError> {
        let started = Instant::now();
        let text = tokio::time::timeout(self.request_timeout, backend.complete(prompt))
            .await
            .map_err(|_elapsed| RunnerError::Timeout(self.request_timeout.as_millis()))??;
        debug!(
            backend = backend.name(),
            model = backend.model(),
            latency_ms = started.elapsed().as_millis(),
            response_chars = text.chars().count(),
            "LLM call completed"
        );
        Ok(text)
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate_content(
        &self,
        agent: &Agent,
        request: &ContentRequest,
    ) -> Result<String, CollaboratorError> {
        let context = post_context(agent, request);
        let raw = self.ask(agent, PromptKind::Post, &context).await?;
        Ok(clean_post_text(&raw, request.max_length)?)
    }

    async fn generate_reaction(
        &self,
        agent: &Agent,
        stimulus: &Stimulus,
    ) -> Result<ReactionDecision, CollaboratorError> {
        let context = reaction_context(agent, stimulus);
        let raw = self.ask(agent, PromptKind::Reaction, &context).await?;
        Ok(parse_reaction(&raw)?)
    }

    async fn generate_memory_update(
        &self,
        agent: &Agent,
        event: &Event,
    ) -> Result<MemoryUpdate, CollaboratorError> {
        let context = event_context(agent, event);
        let raw = self.ask(agent, PromptKind::MemoryUpdate, &context).await?;
        Ok(parse_memory_update(&raw)?)
    }

    async fn generate_relationship_update(
        &self,
        agent: &Agent,
        target: &AgentId,
        interaction: &str,
    ) -> Result<RelationshipUpdate, CollaboratorError> {
        let context = relationship_context(agent, target, interaction);
        let raw = self
            .ask(agent, PromptKind::RelationshipUpdate, &context)
            .await?;
        Ok(parse_relationship_update(&raw)?)
    }
}

// ---------------------------------------------------------------------------
// Prompt contexts
// ---------------------------------------------------------------------------

/// Context for a post, reply or quote.
pub fn post_context(agent: &Agent, request: &ContentRequest) -> Value {
    let conversation: Vec<Value> = request
        .conversation
        .iter()
        .map(|turn| {
            json!({
                "author": turn.author_id,
                "content": turn.content,
                "from_self": turn.from_self,
            })
        })
        .collect();
    let query = [
        Some(request.instruction.as_str()),
        request.reply_to.as_ref().map(|post| post.content.as_str()),
        request.quote_of.as_ref().map(|post| post.content.as_str()),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");
    json!({
        "agent": agent_context(agent),
        "relevant_memories": relevant_memories(agent, &query),
        "persona": request
            .persona_override
            .as_ref()
            .or(agent.custom_system_prompt.as_ref()),
        "instruction": request.instruction,
        "max_length": request.max_length,
        "reply_to": request.reply_to.as_ref().map(post_summary),
        "quote_of": request.quote_of.as_ref().map(post_summary),
        "conversation": conversation,
        "relationship": request
            .audience
            .as_ref()
            .and_then(|target| relationship_summary(agent, target)),
    })
}

/// Context for a reaction judgment.
pub fn reaction_context(agent: &Agent, stimulus: &Stimulus) -> Value {
    json!({
        "agent": agent_context(agent),
        "persona": agent.custom_system_prompt,
        "stimulus": {
            "author": stimulus
                .author_name
                .clone()
                .unwrap_or_else(|| stimulus.author_id.to_string()),
            "content": stimulus.content,
        },
        "relationship": relationship_summary(agent, &stimulus.author_id),
        "relevant_memories": relevant_memories(agent, &stimulus.content),
    })
}

/// Context for deriving a memory update from an event.
pub fn event_context(agent: &Agent, event: &Event) -> Value {
    json!({
        "agent": agent_context(agent),
        "persona": agent.custom_system_prompt,
        "event": {
            "kind": event.kind,
            "summary": event.summary(),
        },
    })
}

/// Context for judging a relationship change.
pub fn relationship_context(agent: &Agent, target: &AgentId, interaction: &str) -> Value {
    json!({
        "agent": agent_context(agent),
        "persona": agent.custom_system_prompt,
        "target": target,
        "interaction": interaction,
        "relationship": relationship_summary(agent, target),
    })
}

/// The persona and current state every prompt shares.
fn agent_context(agent: &Agent) -> Value {
    let memory = &agent.state.memory;
    let core: Vec<&str> = memory.core().iter().map(|item| item.content.as_str()).collect();
    let posts: Vec<&str> = memory
        .recent_posts(PROMPT_RECENT_ITEMS)
        .map(|item| item.content.as_str())
        .collect();
    let events: Vec<&str> = memory
        .recent_events(PROMPT_RECENT_ITEMS)
        .map(|item| item.content.as_str())
        .collect();
    json!({
        "name": agent.name,
        "description": agent.description,
        "personality": agent.personality,
        "style_guide": agent.style_guide,
        "mood": mood::describe(&agent.state.mood),
        "core_memories": core,
        "recent_posts": posts,
        "recent_events": events,
    })
}

/// Non-core memories matching `query`. Core memories are always shown.
fn relevant_memories<'a>(agent: &'a Agent, query: &str) -> Vec<&'a str> {
    agent
        .search_memories(query, agent.state.memory.len(), RELEVANT_MEMORY_THRESHOLD)
        .into_iter()
        .filter(|hit| hit.item.kind != MemoryKind::Core)
        .take(RELEVANT_MEMORY_LIMIT)
        .map(|hit| hit.item.content.as_str())
        .collect()
}

fn post_summary(post: &Post) -> Value {
    json!({
        "author": post.author_id,
        "content": post.content,
    })
}

/// Relationship scalars rounded for display.
fn relationship_summary(agent: &Agent, target: &AgentId) -> Option<Value> {
    agent.relationship(target).map(|relationship| {
        json!({
            "sentiment": format!("{:.2}", relationship.sentiment),
            "familiarity": format!("{:.2}", relationship.familiarity),
            "trust": format!("{:.2}", relationship.trust),
            "notes": relationship.notes,
        })
    })
}
