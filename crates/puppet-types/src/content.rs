//! Typed results exchanged with the content-generation collaborator.
//!
//! Backends may produce free text, but by the time a value of these types
//! reaches the engine it has been parsed and its numbers clamped into the
//! contract ranges below.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::AgentId;
use crate::mood::MoodDelta;
use crate::post::{ConversationTurn, Post};

/// Importance range of a derived memory.
pub const IMPORTANCE_RANGE: (f64, f64) = (0.0, 1.0);
/// Range of each mood delta component of a [`MemoryUpdate`].
pub const MOOD_DELTA_RANGE: (f64, f64) = (-0.5, 0.5);
/// Range of a relationship sentiment delta.
pub const SENTIMENT_DELTA_RANGE: (f64, f64) = (-0.2, 0.2);
/// Range of a relationship familiarity delta.
pub const FAMILIARITY_DELTA_RANGE: (f64, f64) = (0.0, 0.1);

/// The action a collaborator proposes for a non-mention stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ReactionAction {
    /// Reply to the stimulus.
    Reply,
    /// Quote the stimulus with commentary.
    Quote,
    /// Like the stimulus.
    Like,
    /// Do nothing.
    Ignore,
    /// Anything the backend produced that is not one of the above.
    #[serde(other)]
    Unrecognized,
}

impl ReactionAction {
    /// Parse a loosely formatted action name ("Reply", " like ").
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "reply" => Self::Reply,
            "quote" | "quote_tweet" | "quote tweet" | "retweet" => Self::Quote,
            "like" => Self::Like,
            "ignore" | "none" | "skip" => Self::Ignore,
            _ => Self::Unrecognized,
        }
    }

    /// Whether executing the action produces a post.
    pub const fn creates_post(self) -> bool {
        matches!(self, Self::Reply | Self::Quote)
    }
}

/// A proposed reaction to a stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReactionDecision {
    /// Proposed action.
    pub action: ReactionAction,
    /// Suggested text for replies and quotes.
    #[serde(default)]
    pub content: Option<String>,
    /// Why the backend picked the action.
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// How an event should change an agent's memory and mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemoryUpdate {
    /// Text to remember.
    pub memory_text: String,
    /// Importance of the memory, in `[0, 1]`.
    pub importance: f64,
    /// Valence delta, in `[-0.5, 0.5]`.
    pub valence_delta: f64,
    /// Arousal delta, in `[-0.5, 0.5]`.
    pub arousal_delta: f64,
    /// Dominance delta, in `[-0.5, 0.5]`.
    pub dominance_delta: f64,
}

impl MemoryUpdate {
    /// Copy with every number clamped into its contract range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let (imp_lo, imp_hi) = IMPORTANCE_RANGE;
        let (lo, hi) = MOOD_DELTA_RANGE;
        Self {
            memory_text: self.memory_text.clone(),
            importance: self.importance.clamp(imp_lo, imp_hi),
            valence_delta: self.valence_delta.clamp(lo, hi),
            arousal_delta: self.arousal_delta.clamp(lo, hi),
            dominance_delta: self.dominance_delta.clamp(lo, hi),
        }
    }

    /// The mood part of the update.
    pub const fn mood_delta(&self) -> MoodDelta {
        MoodDelta::new(self.valence_delta, self.arousal_delta, self.dominance_delta)
    }
}

/// How an interaction should change a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RelationshipUpdate {
    /// Sentiment delta, in `[-0.2, 0.2]`.
    pub sentiment_delta: f64,
    /// Familiarity delta, in `[0, 0.1]`.
    pub familiarity_delta: f64,
    /// Observation to remember about the other side.
    #[serde(default)]
    pub note: Option<String>,
}

impl RelationshipUpdate {
    /// Copy with both deltas clamped into their contract ranges.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let (s_lo, s_hi) = SENTIMENT_DELTA_RANGE;
        let (f_lo, f_hi) = FAMILIARITY_DELTA_RANGE;
        Self {
            sentiment_delta: self.sentiment_delta.clamp(s_lo, s_hi),
            familiarity_delta: self.familiarity_delta.clamp(f_lo, f_hi),
            note: self.note.clone(),
        }
    }
}

/// Everything the content generator needs to write one post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Shaped instruction (topic plus variety directives).
    pub instruction: String,
    /// Post being replied to.
    pub reply_to: Option<Post>,
    /// Post being quoted.
    pub quote_of: Option<Post>,
    /// Conversation leading up to the reply, oldest first.
    pub conversation: Vec<ConversationTurn>,
    /// Upper bound on the text length, in characters.
    pub max_length: u32,
    /// Persona instruction chosen for this action, replacing the default.
    pub persona_override: Option<String>,
    /// Other account the content is directed at, if any.
    pub audience: Option<AgentId>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unknown_action_deserializes_as_unrecognized() {
        let decision: ReactionDecision =
            serde_json::from_str(r#"{ "action": "dance", "content": null }"#).unwrap();
        assert_eq!(decision.action, ReactionAction::Unrecognized);
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!(ReactionAction::from_label(" Reply "), ReactionAction::Reply);
        assert_eq!(ReactionAction::from_label("QUOTE_TWEET"), ReactionAction::Quote);
        assert_eq!(ReactionAction::from_label("nothing"), ReactionAction::Unrecognized);
        assert!(ReactionAction::Quote.creates_post());
        assert!(!ReactionAction::Like.creates_post());
    }

    #[test]
    fn memory_update_clamps_to_contract() {
        let update = MemoryUpdate {
            memory_text: "big news".to_owned(),
            importance: 1.7,
            valence_delta: -3.0,
            arousal_delta: 0.2,
            dominance_delta: 0.9,
        }
        .clamped();
        assert!((update.importance - 1.0).abs() < f64::EPSILON);
        assert!((update.valence_delta + 0.5).abs() < f64::EPSILON);
        assert!((update.arousal_delta - 0.2).abs() < f64::EPSILON);
        assert!((update.dominance_delta - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn relationship_update_clamps_to_contract() {
        let update = RelationshipUpdate {
            sentiment_delta: 0.5,
            familiarity_delta: -0.3,
            note: None,
        }
        .clamped();
        assert!((update.sentiment_delta - 0.2).abs() < f64::EPSILON);
        assert!(update.familiarity_delta.abs() < f64::EPSILON);
    }
}
