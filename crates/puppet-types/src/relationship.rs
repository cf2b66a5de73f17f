//! Directed relationships from an agent to another account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, PostId};

/// What kind of interaction was recorded against a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum InteractionKind {
    /// The agent replied to the target.
    Reply,
    /// The agent quoted the target.
    Quote,
    /// The agent liked a post of the target.
    Like,
    /// The target mentioned the agent.
    Mention,
    /// An event involving the target was delivered to the agent.
    Event,
}

/// One entry in a relationship's recent interaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InteractionRecord {
    /// Interaction type.
    pub kind: InteractionKind,
    /// Post the interaction was about, if any.
    pub post_id: Option<PostId>,
    /// Short human-readable summary.
    pub summary: String,
    /// When the interaction happened.
    pub at: DateTime<Utc>,
}

/// How an agent feels about one other account.
///
/// Sentiment, familiarity and trust are kept in `[-1, 1]`. Notes and recent
/// interactions are stored newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Relationship {
    /// The other side of the relationship.
    pub target_id: AgentId,
    /// Dislike to liking.
    pub sentiment: f64,
    /// Stranger to close acquaintance.
    pub familiarity: f64,
    /// Distrust to trust.
    pub trust: f64,
    /// Free-form observations, newest first.
    pub notes: Vec<String>,
    /// Most recent interactions, newest first.
    pub recent_interactions: Vec<InteractionRecord>,
    /// Timestamp of the last recorded interaction.
    pub last_interaction_at: Option<DateTime<Utc>>,
}

impl Relationship {
    /// A neutral relationship with no history.
    pub const fn neutral(target_id: AgentId) -> Self {
        Self {
            target_id,
            sentiment: 0.0,
            familiarity: 0.0,
            trust: 0.0,
            notes: Vec::new(),
            recent_interactions: Vec::new(),
            last_interaction_at: None,
        }
    }
}

/// A change to apply to a relationship. Scalar fields are additive deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipChange {
    /// Sentiment delta.
    pub sentiment: f64,
    /// Familiarity delta.
    pub familiarity: f64,
    /// Trust delta.
    pub trust: f64,
    /// Note to prepend.
    pub note: Option<String>,
    /// Interaction to prepend.
    pub interaction: Option<InteractionRecord>,
}
