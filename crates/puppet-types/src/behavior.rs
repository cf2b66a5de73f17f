//! Behavior configuration: posting cadence, interaction probabilities and
//! content preferences.
//!
//! [`BehaviorConfig`] is the persistent per-agent configuration.
//! [`BehaviorOverrides`] carries ephemeral per-call adjustments (for example a
//! monitoring request asking for a longer post); the two are combined into an
//! immutable effective behavior for a single action and never merged back.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// How often an agent posts on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct PostFrequency {
    /// Lower bound of the interval between autonomous posts, in hours.
    pub min_hours_between_posts: f64,
    /// Upper bound of the interval between autonomous posts, in hours.
    pub max_hours_between_posts: f64,
    /// Hours of day (UTC, 0-23) in which the agent tends to post earlier.
    pub peak_posting_hours: Vec<u32>,
}

impl Default for PostFrequency {
    fn default() -> Self {
        Self {
            min_hours_between_posts: 3.0,
            max_hours_between_posts: 12.0,
            peak_posting_hours: Vec::new(),
        }
    }
}

/// Probabilities gating non-mention reactions, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct InteractionPatterns {
    /// Chance that a requested reply is executed.
    pub reply_probability: f64,
    /// Base chance for quotes (further damped when gating).
    pub quote_tweet_probability: f64,
    /// Chance that a requested like is executed.
    pub like_probability: f64,
}

impl Default for InteractionPatterns {
    fn default() -> Self {
        Self {
            reply_probability: 0.5,
            quote_tweet_probability: 0.3,
            like_probability: 0.7,
        }
    }
}

/// Shape of the content an agent produces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct ContentPreferences {
    /// Maximum number of posts in a thread.
    pub max_thread_length: u32,
    /// Typical length of a post, in characters.
    pub typical_post_length: u32,
    /// Fraction of posts that share a link, in `[0, 1]`.
    pub link_sharing_frequency: f64,
}

impl Default for ContentPreferences {
    fn default() -> Self {
        Self {
            max_thread_length: 3,
            typical_post_length: 240,
            link_sharing_frequency: 0.2,
        }
    }
}

/// Persistent behavior configuration of an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct BehaviorConfig {
    /// Posting cadence.
    pub post_frequency: PostFrequency,
    /// Reaction probabilities.
    pub interaction_patterns: InteractionPatterns,
    /// Content shape preferences.
    pub content_preferences: ContentPreferences,
}

/// Per-call adjustments applied on top of [`BehaviorConfig`].
///
/// Every field is optional; `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct BehaviorOverrides {
    /// Override of the typical post length, in characters.
    pub typical_post_length: Option<u32>,
    /// Override of the maximum thread length.
    pub max_thread_length: Option<u32>,
    /// Override of the link sharing frequency.
    pub link_sharing_frequency: Option<f64>,
    /// Override of the reply probability.
    pub reply_probability: Option<f64>,
    /// Override of the quote probability.
    pub quote_tweet_probability: Option<f64>,
    /// Override of the like probability.
    pub like_probability: Option<f64>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_behavior_uses_defaults() {
        let behavior: BehaviorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(behavior, BehaviorConfig::default());
        assert_eq!(behavior.content_preferences.max_thread_length, 3);
        assert!(behavior.post_frequency.peak_posting_hours.is_empty());
    }

    #[test]
    fn partial_behavior_keeps_unspecified_defaults() {
        let json = r#"{
            "postFrequency": { "minHoursBetweenPosts": 1, "peakPostingHours": [9, 17] },
            "interactionPatterns": { "replyProbability": 0.9 }
        }"#;
        let behavior: BehaviorConfig = serde_json::from_str(json).unwrap();
        assert!((behavior.post_frequency.min_hours_between_posts - 1.0).abs() < f64::EPSILON);
        assert!((behavior.post_frequency.max_hours_between_posts - 12.0).abs() < f64::EPSILON);
        assert_eq!(behavior.post_frequency.peak_posting_hours, vec![9, 17]);
        assert!((behavior.interaction_patterns.reply_probability - 0.9).abs() < f64::EPSILON);
        assert!((behavior.interaction_patterns.like_probability - 0.7).abs() < f64::EPSILON);
    }
}
