//! Relationship graph of a single agent.
//!
//! Each agent keeps a directed map from other accounts to a
//! [`Relationship`]. Entries are created lazily on first update, scalar
//! scores are clamped to `[-1, 1]` on every update, notes are prepended
//! without bound and recent interactions are prepended and truncated.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use puppet_types::{AgentId, Relationship, RelationshipChange};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum relationship score.
const SCORE_MAX: f64 = 1.0;

/// Minimum relationship score.
const SCORE_MIN: f64 = -1.0;

/// Number of recent interactions kept per relationship.
pub const RECENT_INTERACTIONS_CAPACITY: usize = 10;

// ---------------------------------------------------------------------------
// RelationshipGraph
// ---------------------------------------------------------------------------

/// Per-agent relationships keyed by the other side's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipGraph {
    relationships: BTreeMap<AgentId, Relationship>,
}

impl RelationshipGraph {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            relationships: BTreeMap::new(),
        }
    }

    /// Look up the relationship with `target`, if one exists.
    pub fn get(&self, target: &AgentId) -> Option<&Relationship> {
        self.relationships.get(target)
    }

    /// Relationship with `target`, creating a neutral one if needed.
    pub fn get_or_create(&mut self, target: &AgentId) -> &mut Relationship {
        self.relationships
            .entry(target.clone())
            .or_insert_with(|| Relationship::neutral(target.clone()))
    }

    /// Seed a relationship from configuration, clamping its scores.
    pub fn seed(&mut self, mut relationship: Relationship) {
        relationship.sentiment = clamp_score(relationship.sentiment);
        relationship.familiarity = clamp_score(relationship.familiarity);
        relationship.trust = clamp_score(relationship.trust);
        relationship
            .recent_interactions
            .truncate(RECENT_INTERACTIONS_CAPACITY);
        self.relationships
            .insert(relationship.target_id.clone(), relationship);
    }

    /// Merge `change` into the relationship with `target`.
    ///
    /// Deltas are added and clamped, the note and interaction (if any) are
    /// prepended, and the last-interaction time is set to `now`. Returns the
    /// updated relationship.
    pub fn update(
        &mut self,
        target: &AgentId,
        change: RelationshipChange,
        now: DateTime<Utc>,
    ) -> &Relationship {
        let relationship = self.get_or_create(target);
        relationship.sentiment = apply(relationship.sentiment, change.sentiment);
        relationship.familiarity = apply(relationship.familiarity, change.familiarity);
        relationship.trust = apply(relationship.trust, change.trust);

        if let Some(note) = change.note
            && !note.trim().is_empty()
        {
            relationship.notes.insert(0, note);
        }
        if let Some(interaction) = change.interaction {
            relationship.recent_interactions.insert(0, interaction);
            relationship
                .recent_interactions
                .truncate(RECENT_INTERACTIONS_CAPACITY);
        }
        relationship.last_interaction_at = Some(now);
        relationship
    }

    /// All relationships, ordered by target id.
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    /// Number of known relationships.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether no relationship exists yet.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// `score + delta`, clamped; non-finite deltas are ignored.
fn apply(score: f64, delta: f64) -> f64 {
    if delta.is_finite() {
        clamp_score(score + delta)
    } else {
        clamp_score(score)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(SCORE_MIN, SCORE_MAX)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use puppet_types::{InteractionKind, InteractionRecord};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn record(summary: &str) -> InteractionRecord {
        InteractionRecord {
            kind: InteractionKind::Reply,
            post_id: None,
            summary: summary.to_owned(),
            at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn relationships_are_created_lazily() {
        let mut graph = RelationshipGraph::new();
        let bob = AgentId::new("bob");
        assert!(graph.get(&bob).is_none());
        graph.update(&bob, RelationshipChange::default(), Utc::now());
        assert_eq!(graph.len(), 1);
        assert!(graph.get(&bob).unwrap().sentiment.abs() < f64::EPSILON);
    }

    #[test]
    fn scores_stay_in_range_under_random_updates() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut graph = RelationshipGraph::new();
        let bob = AgentId::new("bob");
        for _ in 0..1000 {
            let change = RelationshipChange {
                sentiment: rng.random_range(-0.8..0.8),
                familiarity: rng.random_range(-0.8..0.8),
                trust: rng.random_range(-0.8..0.8),
                ..RelationshipChange::default()
            };
            let rel = graph.update(&bob, change, Utc::now());
            for score in [rel.sentiment, rel.familiarity, rel.trust] {
                assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
            }
        }
    }

    #[test]
    fn notes_and_interactions_are_newest_first() {
        let mut graph = RelationshipGraph::new();
        let bob = AgentId::new("bob");
        for n in 0..12 {
            let change = RelationshipChange {
                note: Some(format!("note {n}")),
                interaction: Some(record(&format!("reply {n}"))),
                ..RelationshipChange::default()
            };
            graph.update(&bob, change, Utc::now());
        }
        let rel = graph.get(&bob).unwrap();
        assert_eq!(rel.notes.len(), 12);
        assert_eq!(rel.notes[0], "note 11");
        assert_eq!(rel.recent_interactions.len(), RECENT_INTERACTIONS_CAPACITY);
        assert_eq!(rel.recent_interactions[0].summary, "reply 11");
        assert!(rel.last_interaction_at.is_some());
    }

    #[test]
    fn seeded_scores_are_clamped() {
        let mut graph = RelationshipGraph::new();
        let mut rel = Relationship::neutral(AgentId::new("eve"));
        rel.trust = 4.0;
        rel.sentiment = -9.0;
        graph.seed(rel);
        let rel = graph.get(&AgentId::new("eve")).unwrap();
        assert!((rel.trust - 1.0).abs() < f64::EPSILON);
        assert!((rel.sentiment + 1.0).abs() < f64::EPSILON);
    }
}
