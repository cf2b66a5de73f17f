//! Probability gates for non-mention reactions.
//!
//! A gate is a pure function of the proposed action, the agent's effective
//! interaction probabilities and one uniform draw in `[0, 1)`. Keeping the
//! draw an explicit argument makes every branch testable without a random
//! source.

use puppet_types::{InteractionPatterns, ReactionAction};

/// Extra damping applied to the quote probability.
pub const QUOTE_DAMPING: f64 = 0.5;

/// Decide whether a proposed action is executed.
///
/// Returns the action itself if it passes its gate, otherwise
/// [`ReactionAction::Ignore`]:
///
/// - reply passes iff `draw < reply_probability`
/// - quote passes iff `draw < quote_tweet_probability * 0.5`
/// - like passes iff `draw < like_probability`
/// - ignore and unrecognized actions always become ignore
pub fn gate_reaction(
    action: ReactionAction,
    patterns: &InteractionPatterns,
    draw: f64,
) -> ReactionAction {
    let threshold = match action {
        ReactionAction::Reply => patterns.reply_probability,
        ReactionAction::Quote => patterns.quote_tweet_probability * QUOTE_DAMPING,
        ReactionAction::Like => patterns.like_probability,
        ReactionAction::Ignore | ReactionAction::Unrecognized => return ReactionAction::Ignore,
    };
    if draw < threshold {
        action
    } else {
        ReactionAction::Ignore
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn patterns(reply: f64, quote: f64, like: f64) -> InteractionPatterns {
        InteractionPatterns {
            reply_probability: reply,
            quote_tweet_probability: quote,
            like_probability: like,
        }
    }

    #[test]
    fn zero_reply_probability_never_replies() {
        let mut rng = SmallRng::seed_from_u64(42);
        let p = patterns(0.0, 0.0, 0.0);
        let executed = (0..1_000)
            .filter(|_| gate_reaction(ReactionAction::Reply, &p, rng.random()) == ReactionAction::Reply)
            .count();
        assert_eq!(executed, 0);
    }

    #[test]
    fn full_reply_probability_always_replies() {
        let mut rng = SmallRng::seed_from_u64(42);
        let p = patterns(1.0, 0.0, 0.0);
        let executed = (0..1_000)
            .filter(|_| gate_reaction(ReactionAction::Reply, &p, rng.random()) == ReactionAction::Reply)
            .count();
        assert_eq!(executed, 1_000);
    }

    #[test]
    fn quotes_are_damped() {
        let p = patterns(0.0, 0.8, 0.0);
        assert_eq!(gate_reaction(ReactionAction::Quote, &p, 0.39), ReactionAction::Quote);
        assert_eq!(gate_reaction(ReactionAction::Quote, &p, 0.41), ReactionAction::Ignore);
    }

    #[test]
    fn like_uses_like_probability() {
        let p = patterns(0.0, 0.0, 0.7);
        assert_eq!(gate_reaction(ReactionAction::Like, &p, 0.69), ReactionAction::Like);
        assert_eq!(gate_reaction(ReactionAction::Like, &p, 0.7), ReactionAction::Ignore);
    }

    #[test]
    fn unrecognized_actions_do_nothing() {
        let p = patterns(1.0, 1.0, 1.0);
        assert_eq!(gate_reaction(ReactionAction::Unrecognized, &p, 0.0), ReactionAction::Ignore);
        assert_eq!(gate_reaction(ReactionAction::Ignore, &p, 0.0), ReactionAction::Ignore);
    }
}
