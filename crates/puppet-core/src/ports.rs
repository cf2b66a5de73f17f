//! Collaborator ports.
//!
//! The engine never talks to a language model or a social network
//! directly. It calls these two traits, which are implemented by adapter
//! crates (`puppet-runner` for content generation) or by the embedding
//! binary (the platform client). Both are object safe and held as
//! `Arc<dyn ...>`.
//!
//! Implementations must return already-typed results: any free-text
//! parsing happens inside the adapter, never in the engine.

use async_trait::async_trait;

use puppet_agents::Agent;
use puppet_types::{
    AgentId, ContentRequest, Event, MemoryUpdate, Post, PostId, PostOptions, ReactionDecision,
    RelationshipUpdate, Stimulus,
};

use crate::error::CollaboratorError;

/// Produces text and structured judgments on behalf of an agent.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Write the text of one post (or thread, separated by blank lines).
    async fn generate_content(
        &self,
        agent: &Agent,
        request: &ContentRequest,
    ) -> Result<String, CollaboratorError>;

    /// Propose a reaction to a non-mention stimulus.
    async fn generate_reaction(
        &self,
        agent: &Agent,
        stimulus: &Stimulus,
    ) -> Result<ReactionDecision, CollaboratorError>;

    /// Derive the memory and mood change an event causes.
    async fn generate_memory_update(
        &self,
        agent: &Agent,
        event: &Event,
    ) -> Result<MemoryUpdate, CollaboratorError>;

    /// Derive the relationship change an interaction causes.
    async fn generate_relationship_update(
        &self,
        agent: &Agent,
        target: &AgentId,
        interaction: &str,
    ) -> Result<RelationshipUpdate, CollaboratorError>;
}

/// The social platform the agents live on.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Publish one post.
    async fn post(
        &self,
        agent: &AgentId,
        text: &str,
        options: &PostOptions,
    ) -> Result<Post, CollaboratorError>;

    /// Publish a thread. The default chains replies through [`Platform::post`].
    async fn post_thread(
        &self,
        agent: &AgentId,
        texts: &[String],
    ) -> Result<Vec<Post>, CollaboratorError> {
        let mut posts: Vec<Post> = Vec::with_capacity(texts.len());
        for text in texts {
            let options = PostOptions {
                reply_to: posts.last().map(|post| post.id.clone()),
                quote_of: None,
            };
            posts.push(self.post(agent, text, &options).await?);
        }
        Ok(posts)
    }

    /// Like a post.
    async fn like(&self, agent: &AgentId, post_id: &PostId) -> Result<(), CollaboratorError>;

    /// Fetch a post by id.
    async fn fetch_by_id(&self, post_id: &PostId) -> Result<Post, CollaboratorError>;

    /// Fetch posts mentioning `agent` that arrived after `since`, oldest
    /// first.
    async fn fetch_mentions(
        &self,
        agent: &AgentId,
        since: Option<&PostId>,
    ) -> Result<Vec<Post>, CollaboratorError>;
}
