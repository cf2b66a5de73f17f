//! Round-robin mention polling.
//!
//! Each poll examines exactly one active agent, taking turns in id order.
//! Mentions newer than the agent's cursor are fed to the reaction pipeline
//! oldest first as direct mentions, and the cursor advances past every
//! mention handled. A mention that finds the agent busy stops the walk
//! without advancing, so it is retried on the agent's next turn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use puppet_types::{AgentId, PostId, Stimulus};

use crate::engine::Engine;
use crate::reaction::ReactionOutcome;

/// Result of one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollReport {
    /// The agent whose turn it was; `None` when no agent is active.
    pub agent_id: Option<AgentId>,
    /// Mentions fetched.
    pub fetched: usize,
    /// Mentions handled, with what the reaction did.
    pub handled: Vec<(PostId, ReactionOutcome)>,
    /// A busy agent left mentions for the next turn.
    pub deferred: bool,
    /// Fetch failure, if any.
    pub error: Option<String>,
}

/// Round-robin poller state: whose turn is next and each agent's cursor.
#[derive(Debug, Default)]
pub struct MentionPoller {
    turn: usize,
    since: BTreeMap<AgentId, PostId>,
}

impl MentionPoller {
    /// Create a poller starting with the first agent and no cursors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last mention handled for `agent`.
    pub fn cursor(&self, agent: &AgentId) -> Option<&PostId> {
        self.since.get(agent)
    }

    /// Poll the next agent in turn.
    pub async fn poll_next(&mut self, engine: &Engine) -> PollReport {
        let active = engine.registry().active_handles().await;
        if active.is_empty() {
            return PollReport::default();
        }
        let index = self.turn.checked_rem(active.len()).unwrap_or(0);
        self.turn = index.wrapping_add(1);
        let Some(handle) = active.get(index) else {
            return PollReport::default();
        };
        self.poll_agent(engine, handle.id()).await
    }

    /// Fetch and handle new mentions of one agent.
    pub async fn poll_agent(&mut self, engine: &Engine, agent_id: &AgentId) -> PollReport {
        let mut report = PollReport {
            agent_id: Some(agent_id.clone()),
            ..PollReport::default()
        };
        let mentions = match engine
            .platform
            .fetch_mentions(agent_id, self.since.get(agent_id))
            .await
        {
            Ok(mentions) => mentions,
            Err(error) => {
                warn!(agent_id = %agent_id, error = %error, "Mention fetch failed");
                report.error = Some(error.to_string());
                return report;
            }
        };
        report.fetched = mentions.len();
        if !mentions.is_empty() {
            debug!(agent_id = %agent_id, mentions = mentions.len(), "Handling mentions");
        }

        for post in mentions {
            let stimulus = Stimulus::from_post(&post).mentioning();
            match engine.react(agent_id, &stimulus).await {
                Ok(ReactionOutcome::Busy) => {
                    debug!(agent_id = %agent_id, post_id = %post.id, "Agent busy, mention deferred");
                    report.deferred = true;
                    break;
                }
                Ok(outcome) => report.handled.push((post.id.clone(), outcome)),
                Err(error) => {
                    warn!(agent_id = %agent_id, post_id = %post.id, error = %error, "Mention handling failed");
                }
            }
            self.since.insert(agent_id.clone(), post.id);
        }
        report
    }
}
