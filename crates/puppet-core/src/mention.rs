//! Direct mention detection.
//!
//! A stimulus is a direct mention of an agent when any of these hold:
//!
//! 1. upstream already flagged it as one;
//! 2. its text contains `@name` or `@id` (case-insensitive, whole handle);
//! 3. it replies to a post whose author is the agent;
//! 4. it replies to a post the agent remembers writing.

use puppet_agents::Agent;
use puppet_types::Stimulus;

/// Marker that introduces a handle in post text.
pub const MENTION_MARKER: char = '@';

/// Whether `stimulus` directly addresses `agent`.
pub fn is_direct_mention(agent: &Agent, stimulus: &Stimulus) -> bool {
    if stimulus.is_direct_mention {
        return true;
    }

    let content = stimulus.content.to_lowercase();
    let name = agent.name.to_lowercase();
    let compact_name: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    let id = agent.id.as_str().to_lowercase();
    if [name.as_str(), compact_name.as_str(), id.as_str()]
        .iter()
        .any(|handle| contains_handle(&content, handle))
    {
        return true;
    }

    if stimulus.ancestor_author_id.as_ref() == Some(&agent.id) {
        return true;
    }

    stimulus
        .ancestor_id
        .as_ref()
        .is_some_and(|ancestor| agent.state.memory.authored(ancestor))
}

/// Whether `text` contains `@handle` not immediately followed by another
/// handle character. Both arguments must already be lowercase.
fn contains_handle(text: &str, handle: &str) -> bool {
    if handle.is_empty() {
        return false;
    }
    let needle = format!("{MENTION_MARKER}{handle}");
    text.match_indices(&needle).any(|(start, matched)| {
        text.get(start.saturating_add(matched.len())..)
            .and_then(|rest| rest.chars().next())
            .is_none_or(|next| !(next.is_alphanumeric() || next == '_'))
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use puppet_agents::MemoryLimits;
    use puppet_types::{AgentId, Post, PostId};

    use super::*;

    fn claudia() -> Agent {
        Agent::new(AgentId::new("claudia_ai"), "Claudia", MemoryLimits::default())
    }

    fn stimulus(content: &str) -> Stimulus {
        Stimulus::from_post(&Post {
            id: PostId::new("s1"),
            author_id: AgentId::new("human"),
            content: content.to_owned(),
            in_reply_to: None,
            in_reply_to_author: None,
            quote_of: None,
            created_at: None,
        })
    }

    #[test]
    fn name_mention_is_detected_case_insensitively() {
        assert!(is_direct_mention(&claudia(), &stimulus("hey @Claudia what's up")));
        assert!(is_direct_mention(&claudia(), &stimulus("@CLAUDIA_AI thoughts?")));
    }

    #[test]
    fn unrelated_text_is_not_a_mention() {
        assert!(!is_direct_mention(&claudia(), &stimulus("just talking to myself")));
        assert!(!is_direct_mention(&claudia(), &stimulus("claudia without a marker")));
        assert!(!is_direct_mention(&claudia(), &stimulus("hi @claudiafan")));
    }

    #[test]
    fn upstream_flag_wins() {
        assert!(is_direct_mention(&claudia(), &stimulus("nothing here").mentioning()));
    }

    #[test]
    fn replies_to_the_agent_are_mentions() {
        let mut by_author = stimulus("I disagree");
        by_author.ancestor_id = Some(PostId::new("p1"));
        by_author.ancestor_author_id = Some(AgentId::new("claudia_ai"));
        assert!(is_direct_mention(&claudia(), &by_author));

        let mut agent = claudia();
        agent.record_post(
            &Post {
                id: PostId::new("mine"),
                author_id: agent.id.clone(),
                content: "a thought".to_owned(),
                in_reply_to: None,
                in_reply_to_author: None,
                quote_of: None,
                created_at: None,
            },
            Utc::now(),
        );
        let mut by_memory = stimulus("nice one");
        by_memory.ancestor_id = Some(PostId::new("mine"));
        assert!(is_direct_mention(&agent, &by_memory));
    }
}
