//! The reaction pipeline.
//!
//! ```text
//! received -> mention_check -+-> context_assembly -> immediate_reply -> done
//!                            +-> generation -> gated_execution --------> done
//! ```
//!
//! Direct mentions are always answered, without gates and without the
//! minimum-interval guard. Everything else is offered to the content
//! generator, whose proposed action must then pass its probability gate.
//! Every executed action is attributed to the stimulus author in the
//! agent's relationship graph.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span, warn};

use puppet_agents::Agent;
use puppet_types::{
    AgentId, BehaviorOverrides, InteractionKind, InteractionRecord, Post, PostId, ReactionAction,
    RelationshipChange, RelationshipUpdate, Stimulus,
};

use crate::context::assemble_conversation;
use crate::engine::{Counters, Engine, PostOutcome, PostRequest};
use crate::error::CoreError;
use crate::gating::gate_reaction;
use crate::mention::is_direct_mention;
use crate::registry::AgentHandle;

/// Characters of the stimulus kept in relationship notes and interaction
/// summaries.
pub const EXCERPT_CHARS: usize = 80;

/// Stage of one reaction, recorded on its tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionStage {
    /// The stimulus arrived.
    Received,
    /// Deciding whether the stimulus is a direct mention.
    MentionCheck,
    /// Reconstructing the thread above a mention.
    ContextAssembly,
    /// Answering a mention.
    ImmediateReply,
    /// Asking the generator for a proposed action.
    Generation,
    /// Gating and executing the proposed action.
    GatedExecution,
    /// Finished.
    Done,
}

impl ReactionStage {
    /// Snake-case stage name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::MentionCheck => "mention_check",
            Self::ContextAssembly => "context_assembly",
            Self::ImmediateReply => "immediate_reply",
            Self::Generation => "generation",
            Self::GatedExecution => "gated_execution",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ReactionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reaction did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReactionOutcome {
    /// Replied to the stimulus.
    Replied {
        /// The published reply.
        posts: Vec<Post>,
        /// The stimulus was a direct mention.
        mention: bool,
    },
    /// Quoted the stimulus.
    Quoted {
        /// The published quote.
        posts: Vec<Post>,
    },
    /// Liked the stimulus.
    Liked {
        /// The liked post.
        post_id: PostId,
    },
    /// Decided (or was gated) to do nothing.
    Ignored {
        /// The action the generator proposed.
        proposed: ReactionAction,
    },
    /// Another post operation for the agent was in flight.
    Busy,
    /// Not handled, for the given reason.
    Skipped {
        /// Why.
        reason: String,
    },
}

impl ReactionOutcome {
    /// Whether the reaction had a visible side effect.
    pub const fn is_executed(&self) -> bool {
        matches!(
            self,
            Self::Replied { .. } | Self::Quoted { .. } | Self::Liked { .. }
        )
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// First `max_chars` characters of `text`, with an ellipsis if cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let mut chars = text.trim().chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

impl Engine {
    /// Run the reaction pipeline for one stimulus.
    pub async fn react(
        &self,
        agent_id: &AgentId,
        stimulus: &Stimulus,
    ) -> Result<ReactionOutcome, CoreError> {
        let span = info_span!("reaction", agent_id = %agent_id, post_id = %stimulus.post_id);
        self.react_inner(agent_id, stimulus).instrument(span).await
    }

    async fn react_inner(
        &self,
        agent_id: &AgentId,
        stimulus: &Stimulus,
    ) -> Result<ReactionOutcome, CoreError> {
        debug!(stage = %ReactionStage::Received, author_id = %stimulus.author_id, "Stimulus received");
        let handle = self.registry.get(agent_id).await?;
        if handle.is_stopped() {
            return Ok(ReactionOutcome::skipped("agent stopped"));
        }
        if stimulus.author_id == *agent_id {
            return Ok(ReactionOutcome::skipped("own post"));
        }
        let agent = handle.snapshot().await;

        debug!(stage = %ReactionStage::MentionCheck, "Checking for direct mention");
        let outcome = if is_direct_mention(&agent, stimulus) {
            self.answer_mention(&handle, stimulus).await?
        } else {
            self.consider(&handle, &agent, stimulus).await?
        };

        if outcome.is_executed() {
            Counters::bump(&self.counters.reactions, 1);
            self.attribute(&handle, &agent, stimulus, &outcome).await;
        }
        debug!(stage = %ReactionStage::Done, outcome = ?outcome, "Reaction finished");
        Ok(outcome)
    }

    /// Reply to a direct mention with its conversation as context.
    async fn answer_mention(
        &self,
        handle: &Arc<AgentHandle>,
        stimulus: &Stimulus,
    ) -> Result<ReactionOutcome, CoreError> {
        debug!(stage = %ReactionStage::ContextAssembly, "Assembling conversation");
        let conversation = assemble_conversation(&*self.platform, handle.id(), stimulus).await;

        debug!(stage = %ReactionStage::ImmediateReply, turns = conversation.len(), "Replying to mention");
        let request = PostRequest::reply(stimulus.as_post(), conversation);
        let outcome = self.post_reaction(handle, &request).await?;
        Ok(match outcome {
            PostOutcome::Posted(posts) => {
                info!(agent_id = %handle.id(), "Replied to mention");
                ReactionOutcome::Replied {
                    posts,
                    mention: true,
                }
            }
            other => other_outcome(&other),
        })
    }

    /// Ask the generator what to do, gate it and execute it.
    async fn consider(
        &self,
        handle: &Arc<AgentHandle>,
        agent: &Agent,
        stimulus: &Stimulus,
    ) -> Result<ReactionOutcome, CoreError> {
        debug!(stage = %ReactionStage::Generation, "Requesting reaction");
        let decision = self
            .generator
            .generate_reaction(agent, stimulus)
            .await
            .map_err(|error| self.collaborator_failure(handle, error))?;

        let behavior = agent.effective_behavior(&BehaviorOverrides::default());
        let draw = self.draw().await;
        let action = gate_reaction(decision.action, &behavior.interaction, draw);
        debug!(
            stage = %ReactionStage::GatedExecution,
            proposed = ?decision.action,
            executed = ?action,
            draw,
            "Reaction gated"
        );

        match action {
            ReactionAction::Reply => {
                let request = PostRequest::reply(stimulus.as_post(), Vec::new())
                    .with_draft(decision.content);
                Ok(match self.post_reaction(handle, &request).await? {
                    PostOutcome::Posted(posts) => ReactionOutcome::Replied {
                        posts,
                        mention: false,
                    },
                    other => other_outcome(&other),
                })
            }
            ReactionAction::Quote => {
                let request = PostRequest::quote(stimulus.as_post()).with_draft(decision.content);
                Ok(match self.post_reaction(handle, &request).await? {
                    PostOutcome::Posted(posts) => ReactionOutcome::Quoted { posts },
                    other => other_outcome(&other),
                })
            }
            ReactionAction::Like => {
                self.platform
                    .like(handle.id(), &stimulus.post_id)
                    .await
                    .map_err(|error| self.collaborator_failure(handle, error))?;
                info!(agent_id = %handle.id(), post_id = %stimulus.post_id, "Liked post");
                Ok(ReactionOutcome::Liked {
                    post_id: stimulus.post_id.clone(),
                })
            }
            ReactionAction::Ignore | ReactionAction::Unrecognized => Ok(ReactionOutcome::Ignored {
                proposed: decision.action,
            }),
        }
    }

    /// Post creation under the busy guard, exempt from the interval guard.
    async fn post_reaction(
        &self,
        handle: &Arc<AgentHandle>,
        request: &PostRequest,
    ) -> Result<PostOutcome, CoreError> {
        let Some(guard) = handle.try_begin() else {
            return Ok(PostOutcome::Busy);
        };
        self.publish(&guard, request, Utc::now()).await
    }

    /// Record an executed reaction in the relationship with the author.
    async fn attribute(
        &self,
        handle: &AgentHandle,
        agent: &Agent,
        stimulus: &Stimulus,
        outcome: &ReactionOutcome,
    ) {
        let quoted = excerpt(&stimulus.content, EXCERPT_CHARS);
        let (kind, description) = match outcome {
            ReactionOutcome::Replied { mention: true, .. } => {
                (InteractionKind::Mention, format!("Replied to their mention: {quoted}"))
            }
            ReactionOutcome::Replied { .. } => {
                (InteractionKind::Reply, format!("Replied to their post: {quoted}"))
            }
            ReactionOutcome::Quoted { .. } => {
                (InteractionKind::Quote, format!("Quoted their post: {quoted}"))
            }
            ReactionOutcome::Liked { .. } => {
                (InteractionKind::Like, format!("Liked their post: {quoted}"))
            }
            _ => return,
        };

        let update = match self
            .generator
            .generate_relationship_update(agent, &stimulus.author_id, &description)
            .await
        {
            Ok(update) => update.clamped(),
            Err(error) => {
                warn!(
                    agent_id = %handle.id(),
                    target_id = %stimulus.author_id,
                    error = %error,
                    "Relationship update failed, recording interaction only"
                );
                RelationshipUpdate {
                    sentiment_delta: 0.0,
                    familiarity_delta: 0.0,
                    note: None,
                }
            }
        };
        let note = if kind == InteractionKind::Like {
            Some(description.clone())
        } else {
            update.note
        };

        let now = Utc::now();
        let change = RelationshipChange {
            sentiment: update.sentiment_delta,
            familiarity: update.familiarity_delta,
            trust: 0.0,
            note,
            interaction: Some(InteractionRecord {
                kind,
                post_id: Some(stimulus.post_id.clone()),
                summary: description,
                at: now,
            }),
        };
        handle
            .lock()
            .await
            .update_relationship(&stimulus.author_id, change, now);
    }
}

/// Map a non-posting post outcome to a reaction outcome.
fn other_outcome(outcome: &PostOutcome) -> ReactionOutcome {
    match outcome {
        PostOutcome::Busy => ReactionOutcome::Busy,
        PostOutcome::Stopped => ReactionOutcome::skipped("agent stopped"),
        PostOutcome::Discarded => ReactionOutcome::skipped("agent stopped during generation"),
        PostOutcome::Rejected(_) => ReactionOutcome::skipped("minimum interval"),
        PostOutcome::Posted(_) => ReactionOutcome::skipped("unexpected post"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_cuts_long_text() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("abcdefghij", 4), "abcd...");
        assert_eq!(excerpt("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn only_visible_actions_count_as_executed() {
        assert!(ReactionOutcome::Liked { post_id: PostId::new("p") }.is_executed());
        assert!(!ReactionOutcome::Busy.is_executed());
        assert!(
            !ReactionOutcome::Ignored {
                proposed: ReactionAction::Reply
            }
            .is_executed()
        );
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(ReactionStage::GatedExecution.to_string(), "gated_execution");
        assert_eq!(ReactionStage::MentionCheck.as_str(), "mention_check");
    }
}
