//! The agent aggregate: persona, configuration and mutable state.
//!
//! An [`Agent`] is only mutated through the operations defined here (mood
//! update, memory add, relationship update, post record), so the bounds
//! enforced by [`MemoryStore`], [`RelationshipGraph`] and the mood clamp hold
//! for every agent at all times.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use puppet_types::{
    AgentId, BehaviorConfig, BehaviorOverrides, Event, MemoryId, MemoryItem, MemoryKind,
    MemoryOptions, MemoryUpdate, Mood, MoodDelta, Personality, Post, Relationship,
    RelationshipChange, StyleGuide,
};

use crate::behavior::EffectiveBehavior;
use crate::memory::{MemoryLimits, MemoryMatch, MemoryStore};
use crate::mood;
use crate::social::RelationshipGraph;

// ---------------------------------------------------------------------------
// AgentState
// ---------------------------------------------------------------------------

/// Everything about an agent that changes at runtime.
///
/// Serializes loss-lessly, which is how state is exported for monitoring
/// and persisted by whoever embeds the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Current emotional state.
    pub mood: Mood,
    /// Bounded memory.
    pub memory: MemoryStore,
    /// Relationships with other accounts.
    pub relationships: RelationshipGraph,
    /// When the agent last posted successfully.
    pub last_post_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A persona together with its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique id.
    pub id: AgentId,
    /// Display name, also the handle used to detect mentions.
    pub name: String,
    /// One-paragraph description of the persona.
    pub description: String,
    /// Character traits.
    pub personality: Personality,
    /// Voice and formatting guidance.
    pub style_guide: StyleGuide,
    /// Fixed persona instruction replacing the generated one.
    pub custom_system_prompt: Option<String>,
    /// Persona instructions drawn at random per action when no fixed one is set.
    pub rotating_system_prompts: Vec<String>,
    /// Persistent behavior configuration.
    pub behavior: BehaviorConfig,
    /// Inactive agents are loaded but never scheduled.
    pub is_active: bool,
    /// Mutable runtime state.
    pub state: AgentState,
}

impl Agent {
    /// Create an agent with default persona, behavior and empty state.
    pub fn new(id: AgentId, name: impl Into<String>, limits: MemoryLimits) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            personality: Personality::default(),
            style_guide: StyleGuide::default(),
            custom_system_prompt: None,
            rotating_system_prompts: Vec::new(),
            behavior: BehaviorConfig::default(),
            is_active: true,
            state: AgentState {
                memory: MemoryStore::new(limits),
                ..AgentState::default()
            },
        }
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Apply a mood delta. Returns the previous mood.
    pub fn update_mood(&mut self, delta: MoodDelta) -> Mood {
        mood::apply_delta(&mut self.state.mood, delta)
    }

    /// Add a memory.
    pub fn add_memory(
        &mut self,
        content: impl Into<String>,
        kind: MemoryKind,
        options: MemoryOptions,
        now: DateTime<Utc>,
    ) -> MemoryId {
        self.state.memory.add(content, kind, options, now)
    }

    /// Merge a change into the relationship with `target`.
    pub fn update_relationship(
        &mut self,
        target: &AgentId,
        change: RelationshipChange,
        now: DateTime<Utc>,
    ) -> &Relationship {
        self.state.relationships.update(target, change, now)
    }

    /// Record a successful post: remember it and move the last-post time.
    pub fn record_post(&mut self, post: &Post, now: DateTime<Utc>) -> MemoryId {
        self.state.last_post_at = Some(now);
        self.state.memory.record_post(post, now)
    }

    /// Apply an event-derived update: remember the event and shift the mood.
    pub fn absorb_event(
        &mut self,
        event: &Event,
        update: &MemoryUpdate,
        now: DateTime<Utc>,
    ) -> MemoryId {
        let update = update.clamped();
        let content = if update.memory_text.trim().is_empty() {
            event.summary()
        } else {
            update.memory_text.clone()
        };
        let options = MemoryOptions {
            importance: Some(update.importance),
            emotional_valence: Some(update.valence_delta),
            associations: event
                .target_agent_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            metadata: Some(serde_json::json!({ "event_id": event.id.to_string() })),
        };
        let id = self.add_memory(content, MemoryKind::Event, options, now);
        self.update_mood(update.mood_delta());
        id
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Behavior in force for one action.
    pub fn effective_behavior(&self, overrides: &BehaviorOverrides) -> EffectiveBehavior {
        EffectiveBehavior::resolve(&self.behavior, overrides)
    }

    /// Persona instruction for one action: the fixed override if configured,
    /// else a random rotating one, else none.
    pub fn persona_instruction<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        if let Some(prompt) = &self.custom_system_prompt {
            return Some(prompt.clone());
        }
        self.rotating_system_prompts.choose(rng).cloned()
    }

    /// The agent's most recent post memory.
    pub fn latest_post(&self) -> Option<&MemoryItem> {
        self.state.memory.recent_posts(1).next()
    }

    /// Memories relevant to `query`, best match first.
    /// See [`MemoryStore::search`] for the scoring.
    pub fn search_memories(
        &self,
        query: &str,
        limit: usize,
        threshold: f64,
    ) -> Vec<MemoryMatch<'_>> {
        self.state.memory.search(query, limit, threshold)
    }

    /// Relationship with `target`, if any.
    pub fn relationship(&self, target: &AgentId) -> Option<&Relationship> {
        self.state.relationships.get(target)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use puppet_types::{EventKind, PostId};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn agent() -> Agent {
        Agent::new(AgentId::new("claudia"), "Claudia", MemoryLimits::default())
    }

    #[test]
    fn recording_a_post_moves_last_post_time() {
        let mut agent = agent();
        let now = Utc::now();
        let post = Post {
            id: PostId::new("1"),
            author_id: agent.id.clone(),
            content: "hello world".to_owned(),
            in_reply_to: None,
            in_reply_to_author: None,
            quote_of: None,
            created_at: None,
        };
        agent.record_post(&post, now);
        assert_eq!(agent.state.last_post_at, Some(now));
        assert_eq!(agent.latest_post().unwrap().content, "hello world");
    }

    #[test]
    fn absorbing_an_event_updates_memory_and_mood_together() {
        let mut agent = agent();
        let event = Event::new(EventKind::News, serde_json::json!({ "headline": "X" }));
        let update = MemoryUpdate {
            memory_text: String::new(),
            importance: 0.9,
            valence_delta: 0.3,
            arousal_delta: 0.9,
            dominance_delta: 0.0,
        };
        agent.absorb_event(&event, &update, Utc::now());
        let memory = agent.state.memory.events().first().unwrap();
        assert_eq!(memory.content, "News: X");
        assert!((memory.importance - 0.9).abs() < f64::EPSILON);
        assert!((agent.state.mood.valence - 0.3).abs() < 1e-9);
        // arousal delta clamped to 0.5 before applying
        assert!((agent.state.mood.arousal - 0.5).abs() < 1e-9);
    }

    #[test]
    fn fixed_persona_instruction_wins_over_rotation() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut agent = agent();
        assert!(agent.persona_instruction(&mut rng).is_none());

        agent.rotating_system_prompts = vec!["a".to_owned(), "b".to_owned()];
        let drawn = agent.persona_instruction(&mut rng).unwrap();
        assert!(drawn == "a" || drawn == "b");

        agent.custom_system_prompt = Some("fixed".to_owned());
        assert_eq!(agent.persona_instruction(&mut rng).as_deref(), Some("fixed"));
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut agent = agent();
        let now = Utc::now();
        agent.add_memory("core", MemoryKind::Core, MemoryOptions::default(), now);
        agent.update_mood(MoodDelta::new(0.1, 0.2, 0.3));
        agent.update_relationship(
            &AgentId::new("bob"),
            RelationshipChange {
                sentiment: 0.2,
                note: Some("nice".to_owned()),
                ..RelationshipChange::default()
            },
            now,
        );
        let json = serde_json::to_string(&agent.state).unwrap();
        let restored: AgentState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, agent.state);
    }
}
