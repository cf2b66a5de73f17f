//! Conversation context for replies.
//!
//! Before replying to a mention the engine reconstructs a short thread so
//! the generator sees what is being answered. The walk is capped at two
//! ancestor levels and never fails: any fetch error is logged and the
//! context simply ends where the data does.

use tracing::warn;

use puppet_types::{AgentId, ConversationTurn, Post, Stimulus};

use crate::ports::Platform;

/// Maximum number of ancestor posts fetched above a stimulus.
pub const MAX_ANCESTOR_DEPTH: usize = 2;

/// Build the conversation leading to `stimulus`, oldest first, ending with
/// the stimulus itself. Turns written by `agent` are marked `from_self`.
pub async fn assemble_conversation(
    platform: &dyn Platform,
    agent: &AgentId,
    stimulus: &Stimulus,
) -> Vec<ConversationTurn> {
    let own_turn = ConversationTurn {
        post_id: stimulus.post_id.clone(),
        author_id: stimulus.author_id.clone(),
        content: stimulus.content.clone(),
        from_self: stimulus.author_id == *agent,
    };

    if !stimulus.history.is_empty() {
        let mut history = stimulus.history.clone();
        if history.last().map(|turn| &turn.post_id) != Some(&stimulus.post_id) {
            history.push(own_turn);
        }
        return history;
    }

    // Newest ancestor first while walking up.
    let mut ancestors: Vec<Post> = Vec::with_capacity(MAX_ANCESTOR_DEPTH);
    let mut next = match &stimulus.ancestor {
        Some(parent) => {
            ancestors.push(parent.as_ref().clone());
            parent.in_reply_to.clone()
        }
        None => stimulus.ancestor_id.clone(),
    };
    while ancestors.len() < MAX_ANCESTOR_DEPTH {
        let Some(post_id) = next.take() else {
            break;
        };
        match platform.fetch_by_id(&post_id).await {
            Ok(post) => {
                next = post.in_reply_to.clone();
                ancestors.push(post);
            }
            Err(error) => {
                warn!(post_id = %post_id, error = %error, "Failed to fetch ancestor, continuing without it");
                break;
            }
        }
    }

    ancestors
        .into_iter()
        .rev()
        .map(|post| ConversationTurn {
            from_self: post.author_id == *agent,
            post_id: post.id,
            author_id: post.author_id,
            content: post.content,
        })
        .chain(std::iter::once(own_turn))
        .collect()
}

#[cfg(test)]
mod tests {
    use puppet_types::PostId;

    use super::*;
    use crate::stub::InMemoryPlatform;

    fn post(id: &str, author: &str, reply_to: Option<&str>) -> Post {
        Post {
            id: PostId::new(id),
            author_id: AgentId::new(author),
            content: format!("post {id}"),
            in_reply_to: reply_to.map(PostId::new),
            in_reply_to_author: None,
            quote_of: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn missing_ancestor_leaves_only_the_stimulus() {
        let platform = InMemoryPlatform::new();
        let stimulus = Stimulus::from_post(&post("s1", "bob", Some("gone")));

        let turns = assemble_conversation(&platform, &AgentId::new("claudia"), &stimulus).await;

        assert_eq!(turns.len(), 1);
        assert_eq!(turns.first().map(|turn| turn.post_id.as_str()), Some("s1"));
    }

    #[tokio::test]
    async fn walk_stops_where_the_fetch_fails() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("p1", "claudia", Some("gone"))).await;
        let stimulus = Stimulus::from_post(&post("s1", "bob", Some("p1")));

        let turns = assemble_conversation(&platform, &AgentId::new("claudia"), &stimulus).await;

        let ids: Vec<&str> = turns.iter().map(|turn| turn.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "s1"]);
        assert!(turns.first().is_some_and(|turn| turn.from_self));
    }

    #[tokio::test]
    async fn walk_is_capped_at_two_ancestors() {
        let platform = InMemoryPlatform::new();
        platform.insert_post(post("a0", "carol", None)).await;
        platform.insert_post(post("a1", "bob", Some("a0"))).await;
        platform.insert_post(post("a2", "carol", Some("a1"))).await;
        let stimulus = Stimulus::from_post(&post("s1", "bob", Some("a2")));

        let turns = assemble_conversation(&platform, &AgentId::new("claudia"), &stimulus).await;

        let ids: Vec<&str> = turns.iter().map(|turn| turn.post_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "s1"]);
    }
}
