//! Agent definition files.
//!
//! Each agent is described by one JSON document (camelCase keys). Loading a
//! directory is forgiving: a file that fails to read, parse or validate is
//! reported and skipped, the remaining agents still load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use puppet_types::{
    AgentId, BehaviorConfig, MemoryKind, MemoryOptions, Personality, Relationship, StyleGuide,
};

use crate::agent::Agent;
use crate::error::AgentError;
use crate::memory::MemoryLimits;

/// Importance of configured recent events that do not specify one.
pub const DEFAULT_RECENT_EVENT_IMPORTANCE: f64 = 0.7;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Relationship seeded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialRelationship {
    /// Starting sentiment.
    pub sentiment: f64,
    /// Starting familiarity.
    pub familiarity: f64,
    /// Starting trust.
    pub trust: f64,
    /// Starting notes, newest first.
    pub notes: Vec<String>,
}

/// Event memory seeded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialEvent {
    /// What happened.
    pub content: String,
    /// Importance; defaults to 0.7.
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Memory seeded at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialMemory {
    /// Identity memories.
    pub core_memories: Vec<String>,
    /// Pre-existing relationships keyed by target id.
    pub relationships: BTreeMap<AgentId, InitialRelationship>,
    /// Recent events the agent already knows about.
    pub recent_events: Vec<InitialEvent>,
}

/// One agent definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Unique id (required, non-empty).
    #[serde(default)]
    pub id: String,
    /// Display name (required, non-empty).
    #[serde(default)]
    pub name: String,
    /// Persona description.
    #[serde(default)]
    pub description: String,
    /// Character traits.
    #[serde(default)]
    pub personality: Personality,
    /// Voice and formatting.
    #[serde(default)]
    pub style_guide: StyleGuide,
    /// Fixed persona instruction.
    #[serde(default)]
    pub custom_system_prompt: Option<String>,
    /// Persona instructions rotated per action.
    #[serde(default)]
    pub rotating_system_prompts: Vec<String>,
    /// Whether the agent is scheduled after loading.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Memory seeded at load time.
    #[serde(default)]
    pub initial_memory: InitialMemory,
    /// Behavior configuration.
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

const fn default_active() -> bool {
    true
}

impl AgentConfig {
    /// Parse a definition from JSON text.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check required fields and value ranges.
    pub fn validate(&self) -> Result<(), AgentError> {
        let label = if self.id.trim().is_empty() {
            self.name.clone()
        } else {
            self.id.clone()
        };
        if self.id.trim().is_empty() {
            return Err(AgentError::configuration(label, "missing id"));
        }
        if self.name.trim().is_empty() {
            return Err(AgentError::configuration(label, "missing name"));
        }

        let freq = &self.behavior.post_frequency;
        if !(freq.min_hours_between_posts.is_finite() && freq.min_hours_between_posts >= 0.0) {
            return Err(AgentError::configuration(
                label,
                "minHoursBetweenPosts must be a non-negative number",
            ));
        }
        if !freq.max_hours_between_posts.is_finite()
            || freq.max_hours_between_posts < freq.min_hours_between_posts
        {
            return Err(AgentError::configuration(
                label,
                "maxHoursBetweenPosts must not be below minHoursBetweenPosts",
            ));
        }
        if let Some(hour) = freq.peak_posting_hours.iter().find(|h| **h > 23) {
            return Err(AgentError::configuration(
                label,
                format!("peak posting hour {hour} is not in 0-23"),
            ));
        }

        let patterns = &self.behavior.interaction_patterns;
        for (field, value) in [
            ("replyProbability", patterns.reply_probability),
            ("quoteTweetProbability", patterns.quote_tweet_probability),
            ("likeProbability", patterns.like_probability),
            (
                "linkSharingFrequency",
                self.behavior.content_preferences.link_sharing_frequency,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AgentError::configuration(
                    label,
                    format!("{field} must be within [0, 1], got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Validate and build the runtime agent, seeding its memory.
    pub fn into_agent(self, limits: MemoryLimits, now: DateTime<Utc>) -> Result<Agent, AgentError> {
        self.validate()?;

        let mut agent = Agent::new(AgentId::new(self.id), self.name, limits);
        agent.description = self.description;
        agent.personality = self.personality;
        agent.style_guide = self.style_guide;
        agent.custom_system_prompt = self
            .custom_system_prompt
            .filter(|prompt| !prompt.trim().is_empty());
        agent.rotating_system_prompts = self.rotating_system_prompts;
        agent.behavior = self.behavior;
        agent.is_active = self.is_active;

        let seed = self.initial_memory;
        for content in seed.core_memories {
            agent.add_memory(content, MemoryKind::Core, MemoryOptions::default(), now);
        }
        for event in seed.recent_events {
            let importance = event.importance.unwrap_or(DEFAULT_RECENT_EVENT_IMPORTANCE);
            agent.add_memory(
                event.content,
                MemoryKind::Event,
                MemoryOptions::with_importance(importance),
                now,
            );
        }
        for (target_id, initial) in seed.relationships {
            let mut relationship = Relationship::neutral(target_id);
            relationship.sentiment = initial.sentiment;
            relationship.familiarity = initial.familiarity;
            relationship.trust = initial.trust;
            relationship.notes = initial.notes;
            agent.state.relationships.seed(relationship);
        }
        Ok(agent)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Result of loading a directory of agent definitions.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Agents that loaded successfully, in file-name order.
    pub agents: Vec<Agent>,
    /// Files that were skipped, with the reason.
    pub failures: Vec<(PathBuf, AgentError)>,
}

/// Read, parse and build the agent defined in `path`.
pub fn load_agent_file(
    path: &Path,
    limits: MemoryLimits,
    now: DateTime<Utc>,
) -> Result<Agent, AgentError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AgentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = AgentConfig::parse(&contents).map_err(|source| AgentError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    config.into_agent(limits, now)
}

/// Load every `*.json` file in `dir`.
///
/// Unreadable or invalid files are logged and collected in
/// [`LoadReport::failures`]; a duplicate id keeps the first definition.
pub fn load_agent_dir(dir: &Path, limits: MemoryLimits) -> Result<LoadReport, AgentError> {
    let entries = std::fs::read_dir(dir).map_err(|source| AgentError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let now = Utc::now();
    let mut report = LoadReport::default();
    for path in paths {
        match load_agent_file(&path, limits, now) {
            Ok(agent) if report.agents.iter().any(|a| a.id == agent.id) => {
                warn!(path = %path.display(), agent_id = %agent.id, "Duplicate agent id, skipping");
                let error = AgentError::configuration(agent.id.to_string(), "duplicate agent id");
                report.failures.push((path, error));
            }
            Ok(agent) => {
                info!(agent_id = %agent.id, name = %agent.name, "Loaded agent");
                report.agents.push(agent);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Skipping invalid agent file");
                report.failures.push((path, error));
            }
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const CLAUDIA: &str = r#"{
        "id": "claudia",
        "name": "Claudia",
        "description": "A night-owl poet",
        "personality": { "traits": ["wry"], "interests": ["stars"] },
        "initialMemory": {
            "coreMemories": ["I write at night"],
            "relationships": { "bob": { "sentiment": 0.4, "notes": ["old friend"] } },
            "recentEvents": [{ "content": "saw a comet" }]
        },
        "behavior": { "postFrequency": { "minHoursBetweenPosts": 2, "maxHoursBetweenPosts": 5 } }
    }"#;

    #[test]
    fn builds_agent_with_seeded_memory() {
        let agent = AgentConfig::parse(CLAUDIA)
            .unwrap()
            .into_agent(MemoryLimits::default(), Utc::now())
            .unwrap();
        assert_eq!(agent.id, AgentId::new("claudia"));
        assert!(agent.is_active);
        assert_eq!(agent.state.memory.core().len(), 1);
        let event = agent.state.memory.events().first().unwrap();
        assert!((event.importance - DEFAULT_RECENT_EVENT_IMPORTANCE).abs() < f64::EPSILON);
        let bob = agent.relationship(&AgentId::new("bob")).unwrap();
        assert!((bob.sentiment - 0.4).abs() < f64::EPSILON);
        assert_eq!(bob.notes, vec!["old friend".to_owned()]);
    }

    #[test]
    fn missing_id_is_a_configuration_error() {
        let config = AgentConfig::parse(r#"{ "name": "Nobody" }"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AgentError::Configuration { .. }));
        assert!(err.to_string().contains("missing id"));
    }

    #[test]
    fn inverted_frequency_is_rejected() {
        let json = r#"{
            "id": "x", "name": "X",
            "behavior": { "postFrequency": { "minHoursBetweenPosts": 6, "maxHoursBetweenPosts": 2 } }
        }"#;
        let config = AgentConfig::parse(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn probabilities_must_be_in_range() {
        let json = r#"{
            "id": "x", "name": "X",
            "behavior": { "interactionPatterns": { "likeProbability": 1.5 } }
        }"#;
        let err = AgentConfig::parse(json).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("likeProbability"));
    }
}
