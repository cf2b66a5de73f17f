//! Effective behavior for a single action.
//!
//! An agent's persistent [`BehaviorConfig`] is never mutated to honor a
//! one-off request. Instead each action derives an [`EffectiveBehavior`] from
//! the configuration plus optional [`BehaviorOverrides`] and uses that value
//! for its whole lifetime.

use serde::Serialize;

use puppet_types::{BehaviorConfig, BehaviorOverrides, InteractionPatterns};

/// Behavior values in force for one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveBehavior {
    /// Minimum hours between autonomous posts.
    pub min_hours_between_posts: f64,
    /// Maximum hours between autonomous posts.
    pub max_hours_between_posts: f64,
    /// Peak posting hours (UTC).
    pub peak_posting_hours: Vec<u32>,
    /// Reaction probabilities, each in `[0, 1]`.
    pub interaction: InteractionPatterns,
    /// Maximum posts per thread (at least 1).
    pub max_thread_length: u32,
    /// Typical post length in characters.
    pub typical_post_length: u32,
    /// Fraction of posts sharing a link.
    pub link_sharing_frequency: f64,
}

impl EffectiveBehavior {
    /// Combine the configured behavior with per-call overrides.
    ///
    /// Probabilities are clamped to `[0, 1]` and the thread length is at
    /// least one.
    pub fn resolve(base: &BehaviorConfig, overrides: &BehaviorOverrides) -> Self {
        let patterns = base.interaction_patterns;
        let prefs = base.content_preferences;
        Self {
            min_hours_between_posts: base.post_frequency.min_hours_between_posts,
            max_hours_between_posts: base.post_frequency.max_hours_between_posts,
            peak_posting_hours: base.post_frequency.peak_posting_hours.clone(),
            interaction: InteractionPatterns {
                reply_probability: probability(
                    overrides.reply_probability.unwrap_or(patterns.reply_probability),
                ),
                quote_tweet_probability: probability(
                    overrides
                        .quote_tweet_probability
                        .unwrap_or(patterns.quote_tweet_probability),
                ),
                like_probability: probability(
                    overrides.like_probability.unwrap_or(patterns.like_probability),
                ),
            },
            max_thread_length: overrides
                .max_thread_length
                .unwrap_or(prefs.max_thread_length)
                .max(1),
            typical_post_length: overrides
                .typical_post_length
                .unwrap_or(prefs.typical_post_length),
            link_sharing_frequency: probability(
                overrides
                    .link_sharing_frequency
                    .unwrap_or(prefs.link_sharing_frequency),
            ),
        }
    }

    /// Behavior with no overrides applied.
    pub fn from_config(base: &BehaviorConfig) -> Self {
        Self::resolve(base, &BehaviorOverrides::default())
    }
}

/// Clamp into `[0, 1]`, mapping NaN to zero.
pub fn probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_do_not_touch_the_base() {
        let base = BehaviorConfig::default();
        let overrides = BehaviorOverrides {
            typical_post_length: Some(500),
            reply_probability: Some(3.0),
            ..BehaviorOverrides::default()
        };
        let effective = EffectiveBehavior::resolve(&base, &overrides);
        assert_eq!(effective.typical_post_length, 500);
        assert!((effective.interaction.reply_probability - 1.0).abs() < f64::EPSILON);
        assert_eq!(base.content_preferences.typical_post_length, 240);
    }

    #[test]
    fn thread_length_is_at_least_one() {
        let overrides = BehaviorOverrides {
            max_thread_length: Some(0),
            ..BehaviorOverrides::default()
        };
        let effective = EffectiveBehavior::resolve(&BehaviorConfig::default(), &overrides);
        assert_eq!(effective.max_thread_length, 1);
    }
}
