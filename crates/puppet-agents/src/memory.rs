//! Bounded per-agent memory.
//!
//! A [`MemoryStore`] holds four collections:
//!
//! - **core** -- identity memories; append-only, unbounded, importance 1.0
//! - **events** -- things that happened; capacity `memory_limit / 2`
//! - **posts** -- the agent's own posts; FIFO, capacity `recent_posts_capacity`
//! - **long-term** -- consolidated memories; capacity `memory_limit`
//!
//! The importance-pruned collections evict their least important item when
//! full. Ties evict the oldest, so the survivors are always the top-N by
//! importance with recency breaking ties. No collection is ever over capacity
//! when a mutation returns.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use puppet_types::{MemoryId, MemoryItem, MemoryKind, MemoryOptions, Post, PostId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default total memory limit.
pub const DEFAULT_MEMORY_LIMIT: usize = 100;

/// Default capacity of the recent-posts collection.
pub const DEFAULT_RECENT_POSTS_CAPACITY: usize = 20;

/// Importance given to memories added without one.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

/// Importance of every core memory.
pub const CORE_IMPORTANCE: f64 = 1.0;

/// Metadata key under which post memories store the platform post id.
const POST_ID_KEY: &str = "post_id";

// ---------------------------------------------------------------------------
// MemoryLimits
// ---------------------------------------------------------------------------

/// Capacity configuration of a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryLimits {
    /// Capacity of long-term memory; events get half of it.
    pub memory_limit: usize,
    /// Capacity of the recent-posts FIFO.
    pub recent_posts_capacity: usize,
}

impl MemoryLimits {
    /// Capacity of the events collection.
    pub const fn event_capacity(&self) -> usize {
        self.memory_limit / 2
    }
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            memory_limit: DEFAULT_MEMORY_LIMIT,
            recent_posts_capacity: DEFAULT_RECENT_POSTS_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A search hit with its relevance score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryMatch<'a> {
    /// The matching memory.
    pub item: &'a MemoryItem,
    /// Term-overlap ratio times importance.
    pub score: f64,
}

/// Bounded memory of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    limits: MemoryLimits,
    core: Vec<MemoryItem>,
    events: Vec<MemoryItem>,
    posts: VecDeque<MemoryItem>,
    long_term: Vec<MemoryItem>,
}

impl MemoryStore {
    /// Create an empty store.
    pub const fn new(limits: MemoryLimits) -> Self {
        Self {
            limits,
            core: Vec::new(),
            events: Vec::new(),
            posts: VecDeque::new(),
            long_term: Vec::new(),
        }
    }

    /// Capacity configuration of this store.
    pub const fn limits(&self) -> MemoryLimits {
        self.limits
    }

    /// Add a memory to the collection for `kind`, pruning as needed.
    ///
    /// Core memories always get importance 1.0. Other importances are
    /// clamped to `[0, 1]`, defaulting to 0.5.
    pub fn add(
        &mut self,
        content: impl Into<String>,
        kind: MemoryKind,
        options: MemoryOptions,
        now: DateTime<Utc>,
    ) -> MemoryId {
        let importance = match kind {
            MemoryKind::Core => CORE_IMPORTANCE,
            _ => sanitize_importance(options.importance),
        };
        let item = MemoryItem {
            id: MemoryId::new(),
            content: content.into(),
            kind,
            importance,
            created_at: now,
            emotional_valence: options.emotional_valence,
            associations: options.associations,
            metadata: options.metadata,
        };
        let id = item.id;

        match kind {
            MemoryKind::Core => self.core.push(item),
            MemoryKind::Event => {
                self.events.push(item);
                prune_by_importance(&mut self.events, self.limits.event_capacity());
            }
            MemoryKind::Post => {
                self.posts.push_back(item);
                while self.posts.len() > self.limits.recent_posts_capacity {
                    self.posts.pop_front();
                }
            }
            MemoryKind::LongTerm => {
                self.long_term.push(item);
                prune_by_importance(&mut self.long_term, self.limits.memory_limit);
            }
        }
        id
    }

    /// Remember a post the agent authored.
    pub fn record_post(&mut self, post: &Post, now: DateTime<Utc>) -> MemoryId {
        let options = MemoryOptions {
            metadata: Some(serde_json::json!({ POST_ID_KEY: post.id.as_str() })),
            ..MemoryOptions::default()
        };
        self.add(post.content.clone(), MemoryKind::Post, options, now)
    }

    /// Core memories, oldest first.
    pub fn core(&self) -> &[MemoryItem] {
        &self.core
    }

    /// Event memories, oldest first.
    pub fn events(&self) -> &[MemoryItem] {
        &self.events
    }

    /// Recent posts, oldest first.
    pub fn posts(&self) -> impl DoubleEndedIterator<Item = &MemoryItem> {
        self.posts.iter()
    }

    /// Long-term memories, oldest first.
    pub fn long_term(&self) -> &[MemoryItem] {
        &self.long_term
    }

    /// The `n` most recent posts, newest first.
    pub fn recent_posts(&self, n: usize) -> impl Iterator<Item = &MemoryItem> {
        self.posts.iter().rev().take(n)
    }

    /// The `n` most recent event memories, newest first.
    pub fn recent_events(&self, n: usize) -> impl Iterator<Item = &MemoryItem> {
        self.events.iter().rev().take(n)
    }

    /// Every memory across all collections.
    pub fn iter(&self) -> impl Iterator<Item = &MemoryItem> {
        self.core
            .iter()
            .chain(self.events.iter())
            .chain(self.posts.iter())
            .chain(self.long_term.iter())
    }

    /// Total number of memories.
    pub fn len(&self) -> usize {
        self.core
            .len()
            .saturating_add(self.events.len())
            .saturating_add(self.posts.len())
            .saturating_add(self.long_term.len())
    }

    /// Whether the store holds no memories at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the agent remembers authoring the post `post_id`.
    pub fn authored(&self, post_id: &PostId) -> bool {
        self.posts
            .iter()
            .any(|item| recorded_post_id(item).is_some_and(|id| id == *post_id))
    }

    /// Rank memories against a free-text query.
    ///
    /// Score = (fraction of query terms present in the memory) x importance.
    /// Scores below `threshold` are dropped; the top `limit` are returned,
    /// highest score first, more recent memories first on ties.
    pub fn search(&self, query: &str, limit: usize, threshold: f64) -> Vec<MemoryMatch<'_>> {
        let query_terms = terms(query);
        if query_terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut matches: Vec<MemoryMatch<'_>> = self
            .iter()
            .filter_map(|item| {
                let item_terms = terms(&item.content);
                let overlap = query_terms.intersection(&item_terms).count();
                let score = ratio(overlap, query_terms.len()) * item.importance;
                (score >= threshold).then_some(MemoryMatch { item, score })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.item.created_at.cmp(&a.item.created_at))
        });
        matches.truncate(limit);
        matches
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryLimits::default())
    }
}

/// Platform id of the post a post memory was recorded from.
pub fn recorded_post_id(item: &MemoryItem) -> Option<PostId> {
    item.metadata
        .as_ref()
        .and_then(|meta| meta.get(POST_ID_KEY))
        .and_then(serde_json::Value::as_str)
        .map(PostId::from)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Clamp a caller-supplied importance into `[0, 1]`.
fn sanitize_importance(importance: Option<f64>) -> f64 {
    match importance {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => DEFAULT_IMPORTANCE,
    }
}

/// Drop least-important items (oldest first on ties) until within capacity.
fn prune_by_importance(items: &mut Vec<MemoryItem>, capacity: usize) {
    while items.len() > capacity {
        let weakest = items
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.importance.total_cmp(&b.importance))
            .map(|(index, _)| index);
        match weakest {
            Some(index) => {
                items.remove(index);
            }
            None => break,
        }
    }
}

/// Lowercased alphanumeric terms of `text`.
fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `num / den` as a float, zero when `den` is zero.
fn ratio(num: usize, den: usize) -> f64 {
    match (u32::try_from(num), u32::try_from(den)) {
        (Ok(num), Ok(den)) if den > 0 => f64::from(num) / f64::from(den),
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use chrono::TimeDelta;
    use puppet_types::AgentId;

    use super::*;

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(minutes)
    }

    fn small_store() -> MemoryStore {
        MemoryStore::new(MemoryLimits {
            memory_limit: 6,
            recent_posts_capacity: 3,
        })
    }

    #[test]
    fn core_memories_are_always_fully_important() {
        let mut store = small_store();
        store.add("I was born on a server", MemoryKind::Core, MemoryOptions::with_importance(0.1), at(0));
        assert_eq!(store.core().len(), 1);
        assert!((store.core()[0].importance - CORE_IMPORTANCE).abs() < f64::EPSILON);
    }

    #[test]
    fn events_keep_top_n_by_importance() {
        let mut store = small_store();
        let importances = [0.9, 0.1, 0.5, 0.7, 0.3];
        for (minute, importance) in (0_i64..).zip(importances) {
            store.add(
                format!("event {minute}"),
                MemoryKind::Event,
                MemoryOptions::with_importance(importance),
                at(minute),
            );
            assert!(store.events().len() <= 3);
        }
        let mut kept: Vec<f64> = store.events().iter().map(|m| m.importance).collect();
        kept.sort_by(f64::total_cmp);
        assert_eq!(kept, vec![0.5, 0.7, 0.9]);
    }

    #[test]
    fn importance_ties_evict_the_oldest() {
        let mut store = small_store();
        for minute in 0..4 {
            store.add(
                format!("tie {minute}"),
                MemoryKind::Event,
                MemoryOptions::with_importance(0.5),
                at(minute),
            );
        }
        let contents: Vec<&str> = store.events().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["tie 1", "tie 2", "tie 3"]);
    }

    #[test]
    fn posts_are_fifo() {
        let mut store = small_store();
        for minute in 0..5 {
            let post = Post {
                id: PostId::new(format!("p{minute}")),
                author_id: AgentId::new("claudia"),
                content: format!("post {minute}"),
                in_reply_to: None,
                in_reply_to_author: None,
                quote_of: None,
                created_at: None,
            };
            store.record_post(&post, at(minute));
        }
        let newest: Vec<&str> = store.recent_posts(10).map(|m| m.content.as_str()).collect();
        assert_eq!(newest, vec!["post 4", "post 3", "post 2"]);
        assert!(store.authored(&PostId::new("p4")));
        assert!(!store.authored(&PostId::new("p0")));
    }

    #[test]
    fn long_term_respects_memory_limit() {
        let mut store = small_store();
        for minute in 0..20 {
            store.add(
                "long",
                MemoryKind::LongTerm,
                MemoryOptions::with_importance(0.2),
                at(minute),
            );
        }
        assert_eq!(store.long_term().len(), 6);
    }

    #[test]
    fn search_ranks_by_overlap_times_importance() {
        let mut store = MemoryStore::default();
        store.add("the cat sat on the mat", MemoryKind::Event, MemoryOptions::with_importance(0.4), at(0));
        store.add("a cat and a dog", MemoryKind::Event, MemoryOptions::with_importance(0.9), at(1));
        store.add("nothing relevant", MemoryKind::Event, MemoryOptions::with_importance(1.0), at(2));

        let hits = store.search("cat mat", 5, 0.1);
        assert_eq!(hits.len(), 2);
        // 0.5 * 0.9 = 0.45 beats 1.0 * 0.4 = 0.4
        assert_eq!(hits[0].item.content, "a cat and a dog");
        assert_eq!(hits[1].item.content, "the cat sat on the mat");
    }

    #[test]
    fn search_breaks_ties_by_recency() {
        let mut store = MemoryStore::default();
        store.add("coffee time", MemoryKind::Event, MemoryOptions::default(), at(0));
        store.add("coffee again", MemoryKind::Event, MemoryOptions::default(), at(5));
        let hits = store.search("coffee", 1, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.content, "coffee again");
    }

    #[test]
    fn search_with_empty_query_finds_nothing() {
        let mut store = MemoryStore::default();
        store.add("anything", MemoryKind::Core, MemoryOptions::default(), at(0));
        assert!(store.search("  ?! ", 5, 0.0).is_empty());
    }

    #[test]
    fn store_round_trips_through_json() {
        let mut store = small_store();
        store.add("core", MemoryKind::Core, MemoryOptions::default(), at(0));
        store.add("event", MemoryKind::Event, MemoryOptions::with_importance(0.8), at(1));
        store.add("long", MemoryKind::LongTerm, MemoryOptions::default(), at(2));
        let json = serde_json::to_string(&store).unwrap();
        let restored: MemoryStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, store);
    }
}
