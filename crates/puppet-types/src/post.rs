//! Platform posts and the stimuli agents react to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{AgentId, PostId};

/// A post as seen on the social platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Post {
    /// Platform id.
    pub id: PostId,
    /// Author account.
    pub author_id: AgentId,
    /// Text of the post.
    pub content: String,
    /// Post this one replies to.
    #[serde(default)]
    pub in_reply_to: Option<PostId>,
    /// Author of the post this one replies to.
    #[serde(default)]
    pub in_reply_to_author: Option<AgentId>,
    /// Post this one quotes.
    #[serde(default)]
    pub quote_of: Option<PostId>,
    /// Creation time, when the platform reports it.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reply/quote targeting for a platform post call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOptions {
    /// Post to reply to.
    pub reply_to: Option<PostId>,
    /// Post to quote.
    pub quote_of: Option<PostId>,
}

/// One turn of an assembled conversation, oldest first in a history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConversationTurn {
    /// Post the turn came from.
    pub post_id: PostId,
    /// Author of the turn.
    pub author_id: AgentId,
    /// Text of the turn.
    pub content: String,
    /// Whether the reacting agent wrote this turn.
    pub from_self: bool,
}

/// Inbound content an agent may react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stimulus {
    /// Post being reacted to.
    pub post_id: PostId,
    /// Author of that post.
    pub author_id: AgentId,
    /// Display name of the author, if known.
    #[serde(default)]
    pub author_name: Option<String>,
    /// Text of the post.
    pub content: String,
    /// Post this stimulus replies to.
    #[serde(default)]
    pub ancestor_id: Option<PostId>,
    /// Author of the ancestor post.
    #[serde(default)]
    pub ancestor_author_id: Option<AgentId>,
    /// Ancestor post already resolved upstream.
    #[serde(default)]
    pub ancestor: Option<Box<Post>>,
    /// Conversation already resolved upstream, oldest first.
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    /// Upstream already knows this is a direct mention.
    #[serde(default)]
    pub is_direct_mention: bool,
}

impl Stimulus {
    /// Build a stimulus from a platform post.
    pub fn from_post(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            author_name: None,
            content: post.content.clone(),
            ancestor_id: post.in_reply_to.clone(),
            ancestor_author_id: post.in_reply_to_author.clone(),
            ancestor: None,
            history: Vec::new(),
            is_direct_mention: false,
        }
    }

    /// Mark the stimulus as a direct mention.
    #[must_use]
    pub const fn mentioning(mut self) -> Self {
        self.is_direct_mention = true;
        self
    }

    /// The stimulus itself as a platform post, for reply/quote targeting.
    pub fn as_post(&self) -> Post {
        Post {
            id: self.post_id.clone(),
            author_id: self.author_id.clone(),
            content: self.content.clone(),
            in_reply_to: self.ancestor_id.clone(),
            in_reply_to_author: self.ancestor_author_id.clone(),
            quote_of: None,
            created_at: None,
        }
    }
}
