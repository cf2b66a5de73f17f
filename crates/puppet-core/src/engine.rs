//! The engine: shared post path, scheduled posting and monitoring queries.
//!
//! [`Engine`] owns the agent registry, both collaborator ports, the
//! scheduler queue and the random source. Every component that creates
//! posts (the scheduled driver, the event dispatcher, the reaction pipeline
//! and the monitoring surface) funnels through [`Engine::create_post`] or
//! its internal equivalent, which is where the per-agent busy guard and the
//! minimum-interval guard are enforced.
//!
//! # Locking
//!
//! Collaborator calls never run under an agent's state lock. The post path
//! works on a snapshot taken at the start and commits the post memory and
//! last-post time in one short locked section afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use puppet_agents::{
    Agent, AgentState, EffectiveBehavior, LengthBucket, PostStyle, mood, shape_instruction,
};
use puppet_types::{
    AgentId, BehaviorConfig, BehaviorOverrides, ContentRequest, ConversationTurn, MemoryItem,
    Mood, Personality, Post, PostOptions, Relationship, StyleGuide,
};

use crate::config::EngineConfig;
use crate::error::{CollaboratorError, CoreError};
use crate::ports::{ContentGenerator, Platform};
use crate::registry::{AgentHandle, AgentRegistry, BusyGuard};
use crate::scheduler::{self, Scheduler, SchedulerConfig, fallback_delay, next_post_time};

/// Instruction used when a post request carries none and the agent has no
/// interests to pick a topic from.
pub const DEFAULT_INSTRUCTION: &str = "Share whatever is on your mind right now.";

/// Number of recent posts included in an [`AgentView`].
pub const VIEW_RECENT_POSTS: usize = 5;

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// Options for one post creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostRequest {
    /// What to write about. A topic is chosen from the agent's interests
    /// when absent.
    pub instruction: Option<String>,
    /// Skip the minimum-interval guard (replies, quotes and event reactions).
    pub exempt_from_interval: bool,
    /// Post to reply to.
    pub reply_to: Option<Post>,
    /// Post to quote.
    pub quote_of: Option<Post>,
    /// Conversation leading up to a reply, oldest first.
    pub conversation: Vec<ConversationTurn>,
    /// Per-call behavior overrides.
    pub overrides: BehaviorOverrides,
    /// Allow the generated text to be split into a thread.
    pub thread: bool,
    /// Text already written (for example by the reaction generator);
    /// skips content generation when non-blank.
    pub draft: Option<String>,
}

impl PostRequest {
    /// An interval-exempt reply to `post`.
    pub fn reply(post: Post, conversation: Vec<ConversationTurn>) -> Self {
        Self {
            exempt_from_interval: true,
            reply_to: Some(post),
            conversation,
            ..Self::default()
        }
    }

    /// An interval-exempt quote of `post`.
    pub fn quote(post: Post) -> Self {
        Self {
            exempt_from_interval: true,
            quote_of: Some(post),
            ..Self::default()
        }
    }

    /// Use `draft` as the post text if it is non-blank.
    #[must_use]
    pub fn with_draft(mut self, draft: Option<String>) -> Self {
        self.draft = draft.filter(|text| !text.trim().is_empty());
        self
    }
}

/// Why the minimum-interval guard refused a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardRejection {
    /// The agent's last successful post.
    pub last_post_at: DateTime<Utc>,
    /// Earliest time the next automatic post is allowed.
    pub next_allowed_at: DateTime<Utc>,
    /// Minimum interval in force.
    pub min_hours_between_posts: f64,
}

/// Result of one post creation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PostOutcome {
    /// Published; one post, or several for a thread.
    Posted(Vec<Post>),
    /// Refused by the minimum-interval guard.
    Rejected(GuardRejection),
    /// Another post operation for this agent was in flight.
    Busy,
    /// The agent is stopped.
    Stopped,
    /// The agent was stopped while content was being generated.
    Discarded,
}

impl PostOutcome {
    /// Published posts, empty unless [`PostOutcome::Posted`].
    pub fn posts(&self) -> &[Post] {
        match self {
            Self::Posted(posts) => posts,
            _ => &[],
        }
    }

    /// Whether anything was published.
    pub const fn is_posted(&self) -> bool {
        matches!(self, Self::Posted(_))
    }
}

/// Refuse an automatic post made less than `min_hours` after the last one.
pub fn check_post_interval(
    last_post_at: Option<DateTime<Utc>>,
    min_hours: f64,
    now: DateTime<Utc>,
) -> Result<(), GuardRejection> {
    let Some(last_post_at) = last_post_at else {
        return Ok(());
    };
    let next_allowed_at = last_post_at
        .checked_add_signed(scheduler::hours(min_hours))
        .unwrap_or(last_post_at);
    if now < next_allowed_at {
        return Err(GuardRejection {
            last_post_at,
            next_allowed_at,
            min_hours_between_posts: min_hours,
        });
    }
    Ok(())
}

/// Split generated text into thread parts on blank lines, keeping at most
/// `max_parts`.
pub fn split_thread(text: &str, max_parts: u32) -> Vec<String> {
    let limit = usize::try_from(max_parts.max(1)).unwrap_or(usize::MAX);
    text.split("\n\n")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .take(limit)
        .map(str::to_owned)
        .collect()
}

/// Result of one scheduler-triggered post.
#[derive(Debug)]
pub struct ScheduledRun {
    /// The agent that was due.
    pub agent_id: AgentId,
    /// What the post attempt produced.
    pub result: Result<PostOutcome, CoreError>,
    /// The agent's new pending post time, if it was rescheduled.
    pub next_post_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Monitoring views
// ---------------------------------------------------------------------------

/// Short per-agent status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Agent id.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Not stopped.
    pub active: bool,
    /// A post operation is in flight.
    pub busy: bool,
    /// Consecutive collaborator failures.
    pub failures: u32,
    /// Pending scheduled post time.
    pub next_post_at: Option<DateTime<Utc>>,
    /// Last successful post.
    pub last_post_at: Option<DateTime<Utc>>,
    /// Current mood.
    pub mood: Mood,
    /// Human-readable mood.
    pub mood_description: String,
    /// Memories held.
    pub memory_count: usize,
    /// Relationships held.
    pub relationship_count: usize,
}

/// Detailed view of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    /// Status summary.
    #[serde(flatten)]
    pub summary: AgentSummary,
    /// Persona description.
    pub description: String,
    /// Character traits.
    pub personality: Personality,
    /// Voice and formatting guidance.
    pub style_guide: StyleGuide,
    /// Configured behavior.
    pub behavior: BehaviorConfig,
    /// Most recent posts, newest first.
    pub recent_posts: Vec<MemoryItem>,
    /// Relationships, ordered by target id.
    pub relationships: Vec<Relationship>,
}

/// Engine-wide status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// When the engine was created.
    pub started_at: DateTime<Utc>,
    /// Seconds since `started_at`.
    pub uptime_seconds: u64,
    /// Registered agents.
    pub agent_count: usize,
    /// Agents not stopped.
    pub active_agents: usize,
    /// Agents with a post operation in flight.
    pub busy_agents: usize,
    /// Earliest pending post time.
    pub next_due: Option<DateTime<Utc>>,
    /// Posts published since start.
    pub posts_published: u64,
    /// Reactions executed since start.
    pub reactions_executed: u64,
    /// Events dispatched since start.
    pub events_dispatched: u64,
    /// Collaborator failures since start.
    pub collaborator_failures: u64,
    /// Per-agent summaries, ordered by id.
    pub agents: Vec<AgentSummary>,
}

/// Variety choices made for one generated post, kept for logging.
#[derive(Debug, Clone, Copy)]
struct ShapeSummary {
    style: Option<PostStyle>,
    length: Option<LengthBucket>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) posts: AtomicU64,
    pub(crate) reactions: AtomicU64,
    pub(crate) events: AtomicU64,
    pub(crate) failures: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::AcqRel);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The agent behavior and scheduling engine.
pub struct Engine {
    pub(crate) registry: Arc<AgentRegistry>,
    pub(crate) generator: Arc<dyn ContentGenerator>,
    pub(crate) platform: Arc<dyn Platform>,
    scheduler: Mutex<Scheduler>,
    scheduler_config: SchedulerConfig,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) counters: Counters,
    started_at: DateTime<Utc>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("scheduler_config", &self.scheduler_config)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine. A `seed` makes every random draw reproducible.
    pub fn new(
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn ContentGenerator>,
        platform: Arc<dyn Platform>,
        scheduler_config: SchedulerConfig,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            registry,
            generator,
            platform,
            scheduler: Mutex::new(Scheduler::new()),
            scheduler_config,
            rng: Mutex::new(rng),
            counters: Counters::default(),
            started_at: Utc::now(),
        }
    }

    /// Create an engine from the loaded configuration.
    pub fn from_config(
        registry: Arc<AgentRegistry>,
        generator: Arc<dyn ContentGenerator>,
        platform: Arc<dyn Platform>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(
            registry,
            generator,
            platform,
            config.scheduler,
            config.engine.seed,
        )
    }

    /// The shared agent registry.
    pub const fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// One uniform draw in `[0, 1)` from the engine's random source.
    pub(crate) async fn draw(&self) -> f64 {
        self.rng.lock().await.random::<f64>()
    }

    // -----------------------------------------------------------------------
    // Post creation
    // -----------------------------------------------------------------------

    /// Create a post for an agent.
    ///
    /// Stopped agents get [`PostOutcome::Stopped`]; if another post
    /// operation for the agent is in flight the result is
    /// [`PostOutcome::Busy`].
    pub async fn create_post(
        &self,
        agent_id: &AgentId,
        request: &PostRequest,
    ) -> Result<PostOutcome, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        if handle.is_stopped() {
            return Ok(PostOutcome::Stopped);
        }
        let Some(guard) = handle.try_begin() else {
            debug!(agent_id = %agent_id, "Agent busy, post refused");
            return Ok(PostOutcome::Busy);
        };
        self.publish(&guard, request, Utc::now()).await
    }

    /// The shared post path. The caller already holds the busy guard.
    pub(crate) async fn publish(
        &self,
        guard: &BusyGuard,
        request: &PostRequest,
        now: DateTime<Utc>,
    ) -> Result<PostOutcome, CoreError> {
        let handle = guard.handle();
        let agent = handle.snapshot().await;
        let behavior = agent.effective_behavior(&request.overrides);

        if !request.exempt_from_interval
            && let Err(rejection) = check_post_interval(
                agent.state.last_post_at,
                behavior.min_hours_between_posts,
                now,
            )
        {
            debug!(
                agent_id = %agent.id,
                next_allowed_at = %rejection.next_allowed_at,
                "Post refused by minimum interval"
            );
            return Ok(PostOutcome::Rejected(rejection));
        }

        let (text, shaped) = match request.draft.as_ref().filter(|text| !text.trim().is_empty()) {
            Some(draft) => (draft.clone(), None),
            None => {
                let (text, shaped) = self.generate(handle, &agent, &behavior, request).await?;
                (text, Some(shaped))
            }
        };

        if handle.is_stopped() {
            info!(agent_id = %agent.id, "Agent stopped during generation, discarding post");
            return Ok(PostOutcome::Discarded);
        }

        let parts = if request.thread && request.reply_to.is_none() && request.quote_of.is_none()
        {
            split_thread(&text, behavior.max_thread_length)
        } else {
            Vec::new()
        };
        let published = if parts.len() > 1 {
            self.platform.post_thread(&agent.id, &parts).await
        } else {
            let options = PostOptions {
                reply_to: request.reply_to.as_ref().map(|post| post.id.clone()),
                quote_of: request.quote_of.as_ref().map(|post| post.id.clone()),
            };
            self.platform
                .post(&agent.id, text.trim(), &options)
                .await
                .map(|post| vec![post])
        };
        let posts = match published {
            Ok(posts) => posts,
            Err(error) => return Err(self.collaborator_failure(handle, error)),
        };

        {
            let mut state = handle.lock().await;
            for post in &posts {
                state.record_post(post, now);
            }
        }
        handle.reset_failures();
        Counters::bump(
            &self.counters.posts,
            u64::try_from(posts.len()).unwrap_or(u64::MAX),
        );
        info!(
            agent_id = %agent.id,
            posts = posts.len(),
            style = ?shaped.and_then(|shaped| shaped.style),
            length = ?shaped.and_then(|shaped| shaped.length),
            "Agent posted"
        );
        Ok(PostOutcome::Posted(posts))
    }

    /// Shape the instruction and ask the generator for post text.
    async fn generate(
        &self,
        handle: &AgentHandle,
        agent: &Agent,
        behavior: &EffectiveBehavior,
        request: &PostRequest,
    ) -> Result<(String, ShapeSummary), CoreError> {
        let (shaped, persona_override) = {
            let mut rng = self.rng.lock().await;
            let base = request
                .instruction
                .clone()
                .unwrap_or_else(|| topic_instruction(agent, &mut *rng));
            let shaped = shape_instruction(&base, &mut *rng);
            (shaped, agent.persona_instruction(&mut *rng))
        };
        let summary = ShapeSummary {
            style: shaped.style,
            length: shaped.length,
        };
        let content_request = ContentRequest {
            instruction: shaped.text,
            reply_to: request.reply_to.clone(),
            quote_of: request.quote_of.clone(),
            conversation: request.conversation.clone(),
            max_length: shaped
                .length
                .map_or(behavior.typical_post_length, LengthBucket::max_chars),
            persona_override,
            audience: request
                .reply_to
                .as_ref()
                .or(request.quote_of.as_ref())
                .map(|post| post.author_id.clone()),
        };

        match self.generator.generate_content(agent, &content_request).await {
            Ok(text) if !text.trim().is_empty() => Ok((text, summary)),
            Ok(_) => Err(self.collaborator_failure(
                handle,
                CollaboratorError::ContentGeneration("empty content".to_owned()),
            )),
            Err(error) => Err(self.collaborator_failure(handle, error)),
        }
    }

    /// Count a collaborator failure against the agent and wrap it.
    pub(crate) fn collaborator_failure(
        &self,
        handle: &AgentHandle,
        error: CollaboratorError,
    ) -> CoreError {
        let failures = handle.record_failure();
        Counters::bump(&self.counters.failures, 1);
        warn!(agent_id = %handle.id(), failures, error = %error, "Collaborator call failed");
        CoreError::from(error)
    }

    // -----------------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------------

    /// Pop every due agent and spawn its post creation.
    ///
    /// Returns immediately; the spawned tasks reschedule their agents when
    /// they finish.
    pub async fn tick(self: &Arc<Self>, now: DateTime<Utc>) -> Vec<JoinHandle<ScheduledRun>> {
        let due = self.scheduler.lock().await.pop_due(now);
        if !due.is_empty() {
            debug!(due = due.len(), "Scheduler tick");
        }
        due.into_iter()
            .map(|agent_id| {
                let engine = Arc::clone(self);
                tokio::spawn(async move { engine.run_scheduled(&agent_id, now).await })
            })
            .collect()
    }

    /// Run one scheduled post for `agent_id` and reschedule it.
    ///
    /// Success schedules the next regular post; a failure, rejection or busy
    /// agent schedules a fallback retry; stopped agents are left
    /// unscheduled.
    pub async fn run_scheduled(&self, agent_id: &AgentId, now: DateTime<Utc>) -> ScheduledRun {
        let handle = match self.registry.get(agent_id).await {
            Ok(handle) => handle,
            Err(error) => {
                return ScheduledRun {
                    agent_id: agent_id.clone(),
                    result: Err(error),
                    next_post_at: None,
                };
            }
        };

        let result = if handle.is_stopped() {
            Ok(PostOutcome::Stopped)
        } else if let Some(guard) = handle.try_begin() {
            self.publish(&guard, &PostRequest::default(), now).await
        } else {
            Ok(PostOutcome::Busy)
        };

        let next_post_at = match &result {
            Ok(PostOutcome::Posted(_)) => self.schedule_handle(&handle, now).await,
            Ok(PostOutcome::Stopped | PostOutcome::Discarded) => None,
            Ok(PostOutcome::Busy | PostOutcome::Rejected(_)) | Err(_) => {
                self.schedule_fallback(&handle, now).await
            }
        };
        ScheduledRun {
            agent_id: agent_id.clone(),
            result,
            next_post_at,
        }
    }

    /// Compute and set the agent's next post time.
    pub async fn schedule_next(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        Ok(self.schedule_handle(&handle, now).await)
    }

    /// Schedule every active agent. Returns how many were scheduled.
    pub async fn schedule_all(&self, now: DateTime<Utc>) -> usize {
        let mut scheduled = 0_usize;
        for handle in self.registry.active_handles().await {
            if self.schedule_handle(&handle, now).await.is_some() {
                scheduled = scheduled.saturating_add(1);
            }
        }
        info!(scheduled, "Scheduled active agents");
        scheduled
    }

    /// The agent's pending post time.
    pub async fn pending_post_time(&self, agent_id: &AgentId) -> Option<DateTime<Utc>> {
        self.scheduler.lock().await.pending(agent_id)
    }

    async fn schedule_handle(
        &self,
        handle: &AgentHandle,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if handle.is_stopped() {
            return None;
        }
        let behavior = handle.lock().await.effective_behavior(&BehaviorOverrides::default());
        let due = {
            let mut rng = self.rng.lock().await;
            next_post_time(&behavior, &self.scheduler_config, now, &mut *rng)
        };
        self.scheduler.lock().await.schedule_at(handle.id(), due);
        debug!(agent_id = %handle.id(), next_post_at = %due, "Scheduled next post");
        Some(due)
    }

    async fn schedule_fallback(
        &self,
        handle: &AgentHandle,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if handle.is_stopped() {
            return None;
        }
        let delay = fallback_delay(handle.failures(), &self.scheduler_config);
        let due = now.checked_add_signed(delay).unwrap_or(now);
        self.scheduler.lock().await.schedule_at(handle.id(), due);
        info!(agent_id = %handle.id(), retry_at = %due, "Scheduled fallback post");
        Some(due)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Stop an agent: clear its schedule and discard in-flight results.
    pub async fn stop_agent(&self, agent_id: &AgentId) -> Result<(), CoreError> {
        let handle = self.registry.get(agent_id).await?;
        handle.stop();
        handle.lock().await.is_active = false;
        self.scheduler.lock().await.cancel(agent_id);
        info!(agent_id = %agent_id, "Agent stopped");
        Ok(())
    }

    /// Restart a stopped agent and schedule its next post.
    pub async fn start_agent(
        &self,
        agent_id: &AgentId,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        handle.start();
        handle.lock().await.is_active = true;
        handle.reset_failures();
        info!(agent_id = %agent_id, "Agent started");
        Ok(self.schedule_handle(&handle, now).await)
    }

    /// Register an agent and schedule it if it is active.
    pub async fn load_agent(&self, agent: Agent, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let handle = self.registry.insert(agent).await;
        info!(agent_id = %handle.id(), name = handle.name(), "Agent loaded");
        self.schedule_handle(&handle, now).await
    }

    /// Stop and remove an agent. Returns its final state.
    pub async fn unload_agent(&self, agent_id: &AgentId) -> Result<Agent, CoreError> {
        self.stop_agent(agent_id).await?;
        let handle = self
            .registry
            .remove(agent_id)
            .await
            .ok_or_else(|| CoreError::UnknownAgent(agent_id.clone()))?;
        info!(agent_id = %agent_id, "Agent unloaded");
        Ok(handle.snapshot().await)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Engine-wide status with a summary per agent.
    pub async fn get_status(&self) -> EngineStatus {
        let handles = self.registry.handles().await;
        let (pending, next_due): (BTreeMap<AgentId, DateTime<Utc>>, _) = {
            let scheduler = self.scheduler.lock().await;
            let pending = handles
                .iter()
                .filter_map(|handle| {
                    scheduler
                        .pending(handle.id())
                        .map(|due| (handle.id().clone(), due))
                })
                .collect();
            (pending, scheduler.next_due())
        };

        let mut agents = Vec::with_capacity(handles.len());
        for handle in &handles {
            let next = pending.get(handle.id()).copied();
            agents.push(summarize(handle, &*handle.lock().await, next));
        }

        let now = Utc::now();
        EngineStatus {
            started_at: self.started_at,
            uptime_seconds: u64::try_from(
                now.signed_duration_since(self.started_at).num_seconds().max(0),
            )
            .unwrap_or(u64::MAX),
            agent_count: agents.len(),
            active_agents: agents.iter().filter(|agent| agent.active).count(),
            busy_agents: agents.iter().filter(|agent| agent.busy).count(),
            next_due,
            posts_published: self.counters.posts.load(Ordering::Acquire),
            reactions_executed: self.counters.reactions.load(Ordering::Acquire),
            events_dispatched: self.counters.events.load(Ordering::Acquire),
            collaborator_failures: self.counters.failures.load(Ordering::Acquire),
            agents,
        }
    }

    /// Detailed view of one agent.
    pub async fn get_agent(&self, agent_id: &AgentId) -> Result<AgentView, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        let next = self.pending_post_time(agent_id).await;
        let agent = handle.lock().await;
        Ok(AgentView {
            summary: summarize(&handle, &agent, next),
            description: agent.description.clone(),
            personality: agent.personality.clone(),
            style_guide: agent.style_guide.clone(),
            behavior: agent.behavior.clone(),
            recent_posts: agent
                .state
                .memory
                .recent_posts(VIEW_RECENT_POSTS)
                .cloned()
                .collect(),
            relationships: agent.state.relationships.iter().cloned().collect(),
        })
    }

    /// The agent's complete runtime state.
    pub async fn agent_state(&self, agent_id: &AgentId) -> Result<AgentState, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        let state = handle.lock().await.state.clone();
        Ok(state)
    }
}

fn summarize(handle: &AgentHandle, agent: &Agent, next_post_at: Option<DateTime<Utc>>) -> AgentSummary {
    AgentSummary {
        id: agent.id.clone(),
        name: agent.name.clone(),
        active: !handle.is_stopped(),
        busy: handle.is_busy(),
        failures: handle.failures(),
        next_post_at,
        last_post_at: agent.state.last_post_at,
        mood: agent.state.mood,
        mood_description: mood::describe(&agent.state.mood),
        memory_count: agent.state.memory.len(),
        relationship_count: agent.state.relationships.len(),
    }
}

/// Base instruction for a post without an explicit topic.
fn topic_instruction<R: Rng + ?Sized>(agent: &Agent, rng: &mut R) -> String {
    agent
        .personality
        .interests
        .choose(rng)
        .map_or_else(
            || DEFAULT_INSTRUCTION.to_owned(),
            |interest| format!("Write a post about {interest}."),
        )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn interval_guard_blocks_recent_posts() {
        let now = Utc::now();
        let last = now - TimeDelta::minutes(30);
        let rejection = check_post_interval(Some(last), 1.0, now).unwrap_err();
        assert_eq!(rejection.next_allowed_at, last + TimeDelta::hours(1));
        assert!(check_post_interval(Some(now - TimeDelta::hours(2)), 1.0, now).is_ok());
        assert!(check_post_interval(None, 10.0, now).is_ok());
    }

    #[test]
    fn thread_split_respects_max_length() {
        let text = "first part\n\nsecond part\n\n\n\nthird part";
        assert_eq!(split_thread(text, 2), vec!["first part", "second part"]);
        assert_eq!(split_thread(text, 5).len(), 3);
        assert_eq!(split_thread("single", 0), vec!["single"]);
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let json = serde_json::to_value(PostOutcome::Busy).unwrap();
        assert_eq!(json["outcome"], "busy");
        assert!(PostOutcome::Posted(Vec::new()).is_posted());
        assert!(PostOutcome::Discarded.posts().is_empty());
    }
}
