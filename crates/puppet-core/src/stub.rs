//! In-process collaborators.
//!
//! [`StubContentGenerator`] answers every request with canned values and
//! records what it was asked, so the engine can be exercised end to end
//! without a language model. [`InMemoryPlatform`] is a platform that keeps
//! every post in memory; the binary uses it as a dry-run platform that logs
//! instead of publishing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use puppet_agents::Agent;
use puppet_types::{
    AgentId, ContentRequest, Event, MemoryUpdate, Post, PostId, PostOptions, ReactionAction,
    ReactionDecision, RelationshipUpdate, Stimulus,
};

use crate::error::CollaboratorError;
use crate::ports::{ContentGenerator, Platform};

// ---------------------------------------------------------------------------
// StubContentGenerator
// ---------------------------------------------------------------------------

/// A content generator returning fixed answers.
#[derive(Debug)]
pub struct StubContentGenerator {
    content: Option<String>,
    reaction: ReactionDecision,
    memory_update: MemoryUpdate,
    relationship_update: Option<RelationshipUpdate>,
    delay: Option<Duration>,
    content_calls: AtomicUsize,
    requests: Mutex<Vec<ContentRequest>>,
}

impl StubContentGenerator {
    /// A generator that writes "Hello from {name}", ignores stimuli and
    /// derives neutral, mid-importance memories.
    pub fn new() -> Self {
        Self {
            content: None,
            reaction: ReactionDecision {
                action: ReactionAction::Ignore,
                content: None,
                reasoning: None,
            },
            memory_update: MemoryUpdate {
                memory_text: String::new(),
                importance: 0.5,
                valence_delta: 0.0,
                arousal_delta: 0.0,
                dominance_delta: 0.0,
            },
            relationship_update: Some(RelationshipUpdate {
                sentiment_delta: 0.05,
                familiarity_delta: 0.05,
                note: None,
            }),
            delay: None,
            content_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always write `content`.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Fail every content request.
    #[must_use]
    pub fn failing_content(mut self) -> Self {
        self.content = Some(String::new());
        self
    }

    /// Propose `reaction` for every stimulus.
    #[must_use]
    pub fn with_reaction(mut self, reaction: ReactionDecision) -> Self {
        self.reaction = reaction;
        self
    }

    /// Derive `update` for every event.
    #[must_use]
    pub fn with_memory_update(mut self, update: MemoryUpdate) -> Self {
        self.memory_update = update;
        self
    }

    /// Fail every relationship update request.
    #[must_use]
    pub fn failing_relationships(mut self) -> Self {
        self.relationship_update = None;
        self
    }

    /// Sleep for `delay` inside every content request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of content requests served so far.
    pub fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::Acquire)
    }

    /// Every content request received, in order.
    pub async fn requests(&self) -> Vec<ContentRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for StubContentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for StubContentGenerator {
    async fn generate_content(
        &self,
        agent: &Agent,
        request: &ContentRequest,
    ) -> Result<String, CollaboratorError> {
        self.content_calls.fetch_add(1, Ordering::AcqRel);
        self.requests.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.content {
            Some(text) if text.is_empty() => Err(CollaboratorError::ContentGeneration(
                "stub configured to fail".to_owned(),
            )),
            Some(text) => Ok(text.clone()),
            None => Ok(format!("Hello from {}", agent.name)),
        }
    }

    async fn generate_reaction(
        &self,
        _agent: &Agent,
        _stimulus: &Stimulus,
    ) -> Result<ReactionDecision, CollaboratorError> {
        Ok(self.reaction.clone())
    }

    async fn generate_memory_update(
        &self,
        _agent: &Agent,
        _event: &Event,
    ) -> Result<MemoryUpdate, CollaboratorError> {
        Ok(self.memory_update.clone())
    }

    async fn generate_relationship_update(
        &self,
        _agent: &Agent,
        _target: &AgentId,
        _interaction: &str,
    ) -> Result<RelationshipUpdate, CollaboratorError> {
        self.relationship_update.clone().ok_or_else(|| {
            CollaboratorError::ContentGeneration("stub configured to fail".to_owned())
        })
    }
}

// ---------------------------------------------------------------------------
// InMemoryPlatform
// ---------------------------------------------------------------------------

/// A platform that stores posts in memory instead of publishing them.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    next_id: AtomicU64,
    posts: Mutex<BTreeMap<PostId, Post>>,
    published: Mutex<Vec<Post>>,
    likes: Mutex<Vec<(AgentId, PostId)>>,
    mentions: Mutex<BTreeMap<AgentId, Vec<Post>>>,
}

impl InMemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `post` fetchable by id (for example as a thread ancestor).
    pub async fn insert_post(&self, post: Post) {
        self.posts.lock().await.insert(post.id.clone(), post);
    }

    /// Queue `post` as a mention of `agent`.
    pub async fn push_mention(&self, agent: &AgentId, post: Post) {
        self.insert_post(post.clone()).await;
        self.mentions
            .lock()
            .await
            .entry(agent.clone())
            .or_default()
            .push(post);
    }

    /// Every post published through this platform, in order.
    pub async fn published(&self) -> Vec<Post> {
        self.published.lock().await.clone()
    }

    /// Every like, in order.
    pub async fn likes(&self) -> Vec<(AgentId, PostId)> {
        self.likes.lock().await.clone()
    }

    fn allocate_id(&self) -> PostId {
        let n = self.next_id.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        PostId::new(format!("local-{n}"))
    }
}

#[async_trait]
impl Platform for InMemoryPlatform {
    async fn post(
        &self,
        agent: &AgentId,
        text: &str,
        options: &PostOptions,
    ) -> Result<Post, CollaboratorError> {
        let in_reply_to_author = match &options.reply_to {
            Some(parent) => self
                .posts
                .lock()
                .await
                .get(parent)
                .map(|post| post.author_id.clone()),
            None => None,
        };
        let post = Post {
            id: self.allocate_id(),
            author_id: agent.clone(),
            content: text.to_owned(),
            in_reply_to: options.reply_to.clone(),
            in_reply_to_author,
            quote_of: options.quote_of.clone(),
            created_at: Some(Utc::now()),
        };
        info!(
            agent_id = %agent,
            post_id = %post.id,
            reply_to = ?post.in_reply_to,
            quote_of = ?post.quote_of,
            content = %post.content,
            "Published post (dry run)"
        );
        self.insert_post(post.clone()).await;
        self.published.lock().await.push(post.clone());
        Ok(post)
    }

    async fn like(&self, agent: &AgentId, post_id: &PostId) -> Result<(), CollaboratorError> {
        info!(agent_id = %agent, post_id = %post_id, "Liked post (dry run)");
        self.likes.lock().await.push((agent.clone(), post_id.clone()));
        Ok(())
    }

    async fn fetch_by_id(&self, post_id: &PostId) -> Result<Post, CollaboratorError> {
        self.posts
            .lock()
            .await
            .get(post_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::Platform(format!("post {post_id} not found")))
    }

    async fn fetch_mentions(
        &self,
        agent: &AgentId,
        since: Option<&PostId>,
    ) -> Result<Vec<Post>, CollaboratorError> {
        let mentions = self.mentions.lock().await;
        let Some(queue) = mentions.get(agent) else {
            return Ok(Vec::new());
        };
        let start = since
            .and_then(|since| queue.iter().position(|post| &post.id == since))
            .map_or(0, |index| index.saturating_add(1));
        Ok(queue.iter().skip(start).cloned().collect())
    }
}
