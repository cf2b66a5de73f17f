//! Memory items stored per agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::MemoryId;

/// Which collection of the memory store an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum MemoryKind {
    /// Identity-defining memories. Immutable, always importance 1.0.
    Core,
    /// Things that happened to the agent (news, interactions).
    Event,
    /// Posts the agent authored.
    Post,
    /// Consolidated memories kept for a long time.
    LongTerm,
}

/// A single remembered item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemoryItem {
    /// Unique id of the item.
    pub id: MemoryId,
    /// Remembered text.
    pub content: String,
    /// Collection the item belongs to.
    pub kind: MemoryKind,
    /// Retention weight in `[0, 1]`.
    pub importance: f64,
    /// When the item was remembered.
    pub created_at: DateTime<Utc>,
    /// Emotional charge of the memory, if known.
    pub emotional_valence: Option<f64>,
    /// Free-form tags linking the memory to people or topics.
    pub associations: Vec<String>,
    /// Structured extras (for post memories: the platform post id).
    pub metadata: Option<serde_json::Value>,
}

/// Optional attributes when adding a memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryOptions {
    /// Importance; defaults to 0.5. Ignored for core memories.
    pub importance: Option<f64>,
    /// Emotional charge.
    pub emotional_valence: Option<f64>,
    /// Association tags.
    pub associations: Vec<String>,
    /// Structured extras.
    pub metadata: Option<serde_json::Value>,
}

impl MemoryOptions {
    /// Options carrying only an importance.
    pub const fn with_importance(importance: f64) -> Self {
        Self {
            importance: Some(importance),
            emotional_valence: None,
            associations: Vec::new(),
            metadata: None,
        }
    }
}
