//! Events delivered to agents by the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, EventId, PostId};

/// Kind of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// Something happened in the world.
    News,
    /// An external push on the agents' emotional state.
    MoodShift,
    /// A nudge for one agent to interact with another.
    InteractionPrompt,
}

/// Payload of an [`EventKind::InteractionPrompt`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct InteractionPrompt {
    /// Agent that should react.
    pub initiator_id: AgentId,
    /// Agent whose content is reacted to.
    pub target_id: AgentId,
    /// Content to react to. Falls back to the target's latest post.
    #[serde(default)]
    pub content: Option<String>,
    /// Post the content belongs to, if known.
    #[serde(default)]
    pub post_id: Option<PostId>,
}

/// A transient event. An empty target list means broadcast to every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Unique id.
    #[serde(default)]
    pub id: EventId,
    /// What happened.
    pub kind: EventKind,
    /// Recipients. Empty means every active agent.
    #[serde(default)]
    pub target_agent_ids: Vec<AgentId>,
    /// Kind-specific payload.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Build an event of `kind` carrying `data`, broadcast to every agent.
    pub fn new(kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            id: EventId::new(),
            kind,
            target_agent_ids: Vec::new(),
            data,
            created_at: Utc::now(),
        }
    }

    /// Build an interaction prompt addressed to both participants.
    pub fn interaction_prompt(prompt: &InteractionPrompt) -> Self {
        let data = serde_json::to_value(prompt).unwrap_or(serde_json::Value::Null);
        Self {
            target_agent_ids: vec![prompt.initiator_id.clone(), prompt.target_id.clone()],
            ..Self::new(EventKind::InteractionPrompt, data)
        }
    }

    /// Restrict the event to the given recipients.
    #[must_use]
    pub fn with_targets(mut self, targets: Vec<AgentId>) -> Self {
        self.target_agent_ids = targets;
        self
    }

    /// Whether the event is addressed to every agent.
    pub const fn is_broadcast(&self) -> bool {
        self.target_agent_ids.is_empty()
    }

    /// Decode the interaction prompt payload, if this is one.
    pub fn as_interaction_prompt(&self) -> Option<InteractionPrompt> {
        if self.kind != EventKind::InteractionPrompt {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    /// One-line description of the event for prompts and logs.
    pub fn summary(&self) -> String {
        let text = ["headline", "description", "content", "text"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(serde_json::Value::as_str));
        match (self.kind, text) {
            (EventKind::News, Some(text)) => format!("News: {text}"),
            (EventKind::MoodShift, Some(text)) => format!("Mood shift: {text}"),
            (EventKind::InteractionPrompt, Some(text)) => format!("Interaction: {text}"),
            (kind, None) => format!("{kind:?} event: {}", self.data),
        }
    }
}
