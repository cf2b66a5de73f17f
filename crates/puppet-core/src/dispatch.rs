//! Event dispatch.
//!
//! An [`Event`] is delivered to every agent it targets (every active agent
//! when it targets nobody in particular). Each recipient is handled
//! concurrently and independently: the content generator derives a memory
//! update, the memory and mood change are committed together, and then the
//! event may trigger a post or, for interaction prompts, a reaction.
//! Triggered posts skip the minimum-interval guard but not the busy guard.
//! One recipient failing never affects the others.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use puppet_agents::recorded_post_id;
use puppet_types::{
    AgentId, Event, EventId, EventKind, InteractionPrompt, MemoryUpdate, PostId, Stimulus,
};

use crate::engine::{Counters, Engine, PostOutcome, PostRequest};
use crate::error::CoreError;
use crate::reaction::ReactionOutcome;

/// News at or below this importance only triggers a post by chance.
pub const NEWS_TRIGGER_IMPORTANCE: f64 = 0.7;

/// Chance that less important news triggers a post.
pub const NEWS_TRIGGER_PROBABILITY: f64 = 0.3;

/// Mood shifts moving arousal by more than this always trigger a post.
pub const MOOD_SHIFT_TRIGGER_AROUSAL: f64 = 0.3;

/// Chance that a smaller mood shift triggers a post.
pub const MOOD_SHIFT_TRIGGER_PROBABILITY: f64 = 0.2;

/// Whether an absorbed event makes the agent post about it.
///
/// `update` must already be clamped; `draw` is uniform in `[0, 1)`.
/// Interaction prompts never trigger a plain post.
pub fn should_trigger_post(kind: EventKind, update: &MemoryUpdate, draw: f64) -> bool {
    match kind {
        EventKind::News => {
            update.importance > NEWS_TRIGGER_IMPORTANCE || draw < NEWS_TRIGGER_PROBABILITY
        }
        EventKind::MoodShift => {
            update.arousal_delta.abs() > MOOD_SHIFT_TRIGGER_AROUSAL
                || draw < MOOD_SHIFT_TRIGGER_PROBABILITY
        }
        EventKind::InteractionPrompt => false,
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A post an event triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredPost {
    /// Posting agent.
    pub agent_id: AgentId,
    /// What the post attempt produced.
    pub outcome: PostOutcome,
}

/// A reaction an interaction prompt triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredReaction {
    /// Reacting agent.
    pub agent_id: AgentId,
    /// What the reaction did.
    pub outcome: ReactionOutcome,
}

/// A recipient the event could not be delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    /// The recipient.
    pub agent_id: AgentId,
    /// What went wrong.
    pub reason: String,
}

/// Result of dispatching one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// The dispatched event.
    pub event_id: EventId,
    /// Agents that absorbed the event.
    pub delivered: Vec<AgentId>,
    /// Posts the event triggered.
    pub posts: Vec<TriggeredPost>,
    /// Reactions the event triggered.
    pub reactions: Vec<TriggeredReaction>,
    /// Recipients that failed.
    pub failures: Vec<DispatchFailure>,
}

enum FollowUp {
    None,
    Post(PostOutcome),
    Reaction(ReactionOutcome),
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

impl Engine {
    /// Deliver an event to its recipients.
    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        Counters::bump(&self.counters.events, 1);
        let now = Utc::now();

        let mut failures = Vec::new();
        let recipients: Vec<AgentId> = if event.is_broadcast() {
            self.registry
                .active_handles()
                .await
                .iter()
                .map(|handle| handle.id().clone())
                .collect()
        } else {
            let mut known = Vec::with_capacity(event.target_agent_ids.len());
            for id in &event.target_agent_ids {
                if self.registry.find(id).await.is_some() {
                    known.push(id.clone());
                } else {
                    failures.push(DispatchFailure {
                        agent_id: id.clone(),
                        reason: CoreError::UnknownAgent(id.clone()).to_string(),
                    });
                }
            }
            known
        };
        info!(
            event_id = %event.id,
            kind = ?event.kind,
            recipients = recipients.len(),
            "Dispatching event"
        );

        let prompt = event.as_interaction_prompt();
        let results = join_all(
            recipients
                .iter()
                .map(|agent_id| self.deliver(agent_id, event, prompt.as_ref(), now)),
        )
        .await;

        let mut report = DispatchReport {
            event_id: event.id,
            delivered: Vec::with_capacity(recipients.len()),
            posts: Vec::new(),
            reactions: Vec::new(),
            failures,
        };
        for (agent_id, result) in recipients.into_iter().zip(results) {
            match result {
                Ok(follow_up) => {
                    match follow_up {
                        FollowUp::None => {}
                        FollowUp::Post(outcome) => report.posts.push(TriggeredPost {
                            agent_id: agent_id.clone(),
                            outcome,
                        }),
                        FollowUp::Reaction(outcome) => report.reactions.push(TriggeredReaction {
                            agent_id: agent_id.clone(),
                            outcome,
                        }),
                    }
                    report.delivered.push(agent_id);
                }
                Err(error) => {
                    warn!(agent_id = %agent_id, event_id = %event.id, error = %error, "Event delivery failed");
                    report.failures.push(DispatchFailure {
                        agent_id,
                        reason: error.to_string(),
                    });
                }
            }
        }
        report
    }

    /// Deliver an event on behalf of the monitoring surface.
    pub async fn trigger_event(&self, event: &Event) -> DispatchReport {
        self.dispatch(event).await
    }

    /// Absorb the event into one agent and run its follow-up.
    async fn deliver(
        &self,
        agent_id: &AgentId,
        event: &Event,
        prompt: Option<&InteractionPrompt>,
        now: DateTime<Utc>,
    ) -> Result<FollowUp, CoreError> {
        let handle = self.registry.get(agent_id).await?;
        let agent = handle.snapshot().await;
        let update = self
            .generator
            .generate_memory_update(&agent, event)
            .await
            .map_err(|error| self.collaborator_failure(&handle, error))?
            .clamped();
        handle.lock().await.absorb_event(event, &update, now);
        debug!(agent_id = %agent_id, importance = update.importance, "Event absorbed");

        if handle.is_stopped() {
            return Ok(FollowUp::None);
        }

        if let Some(prompt) = prompt {
            if prompt.initiator_id != *agent_id {
                return Ok(FollowUp::None);
            }
            let Some(stimulus) = self.prompt_stimulus(prompt, event).await else {
                warn!(
                    agent_id = %agent_id,
                    target_id = %prompt.target_id,
                    "Interaction prompt has no content to react to"
                );
                return Ok(FollowUp::None);
            };
            let outcome = self.react(agent_id, &stimulus).await?;
            return Ok(FollowUp::Reaction(outcome));
        }

        if !should_trigger_post(event.kind, &update, self.draw().await) {
            return Ok(FollowUp::None);
        }
        let request = PostRequest {
            instruction: Some(format!(
                "Write a post reacting to this: {}",
                event.summary()
            )),
            exempt_from_interval: true,
            ..PostRequest::default()
        };
        let outcome = self.create_post(agent_id, &request).await?;
        Ok(FollowUp::Post(outcome))
    }

    /// Stimulus representing the target's side of an interaction prompt:
    /// the payload content, else the target's most recent post.
    async fn prompt_stimulus(&self, prompt: &InteractionPrompt, event: &Event) -> Option<Stimulus> {
        let target = match self.registry.find(&prompt.target_id).await {
            Some(handle) => Some(handle.snapshot().await),
            None => None,
        };
        let latest = target.as_ref().and_then(|agent| agent.latest_post().cloned());

        let content = prompt
            .content
            .clone()
            .or_else(|| latest.as_ref().map(|item| item.content.clone()))?;
        let post_id = prompt
            .post_id
            .clone()
            .or_else(|| {
                prompt
                    .content
                    .is_none()
                    .then(|| latest.as_ref().and_then(recorded_post_id))
                    .flatten()
            })
            .unwrap_or_else(|| PostId::new(format!("event-{}", event.id)));

        Some(Stimulus {
            post_id,
            author_id: prompt.target_id.clone(),
            author_name: target.map(|agent| agent.name),
            content,
            ancestor_id: None,
            ancestor_author_id: None,
            ancestor: None,
            history: Vec::new(),
            is_direct_mention: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn update(importance: f64, arousal: f64) -> MemoryUpdate {
        MemoryUpdate {
            memory_text: String::new(),
            importance,
            valence_delta: 0.0,
            arousal_delta: arousal,
            dominance_delta: 0.0,
        }
    }

    #[test]
    fn important_news_always_triggers() {
        assert!(should_trigger_post(EventKind::News, &update(0.9, 0.0), 0.99));
        assert!(!should_trigger_post(EventKind::News, &update(0.7, 0.0), 0.5));
        assert!(should_trigger_post(EventKind::News, &update(0.1, 0.0), 0.29));
    }

    #[test]
    fn strong_mood_shifts_always_trigger() {
        assert!(should_trigger_post(EventKind::MoodShift, &update(0.0, -0.4), 0.99));
        assert!(!should_trigger_post(EventKind::MoodShift, &update(0.0, 0.3), 0.2));
        assert!(should_trigger_post(EventKind::MoodShift, &update(0.0, 0.0), 0.19));
    }

    #[test]
    fn interaction_prompts_never_post() {
        assert!(!should_trigger_post(EventKind::InteractionPrompt, &update(1.0, 0.5), 0.0));
    }
}
