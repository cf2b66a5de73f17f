//! Structural variety for content requests.
//!
//! Left alone, a generator tends to settle into one shape of post. Before
//! every request the base instruction is shaped with a randomly chosen
//! structural style, a length bucket, an optional elaboration directive and
//! an optional stylistic constraint. The shaping only ever appends to the
//! base instruction and is a pure function of the random draws.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

/// Chance that a request is shaped at all.
pub const SHAPE_PROBABILITY: f64 = 0.8;

/// Chance of an elaboration directive for medium and longer posts.
pub const ELABORATION_PROBABILITY: f64 = 0.4;

/// Chance of one extra stylistic constraint.
pub const CONSTRAINT_PROBABILITY: f64 = 0.4;

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

/// Structural style of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStyle {
    /// A direct, self-contained statement.
    Statement,
    /// A genuine question.
    Question,
    /// A small, specific observation.
    Observation,
    /// An incomplete thought.
    Fragment,
    /// A brief personal reflection.
    Reflection,
    /// Built around one metaphor.
    Metaphor,
    /// A bold, opinionated claim.
    Declaration,
    /// Two things set against each other.
    Contrast,
    /// As few words as possible.
    Minimal,
    /// A very short list.
    List,
}

impl PostStyle {
    /// Every style, in catalog order.
    pub const ALL: [Self; 10] = [
        Self::Statement,
        Self::Question,
        Self::Observation,
        Self::Fragment,
        Self::Reflection,
        Self::Metaphor,
        Self::Declaration,
        Self::Contrast,
        Self::Minimal,
        Self::List,
    ];

    /// What the generator should do.
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::Statement => "Make a direct, self-contained statement.",
            Self::Question => "Pose a genuine question to your followers.",
            Self::Observation => "Share a small, specific observation about the world around you.",
            Self::Fragment => "Write an incomplete thought or a sentence fragment.",
            Self::Reflection => "Reflect briefly on something personal.",
            Self::Metaphor => "Build the post around a single metaphor.",
            Self::Declaration => "Make a bold, opinionated declaration.",
            Self::Contrast => "Set two things or two moments against each other.",
            Self::Minimal => "Say it in as few words as possible.",
            Self::List => "Write a very short list.",
        }
    }

    /// One example of the style.
    pub const fn example(self) -> &'static str {
        match self {
            Self::Statement => "Coffee tastes better at 3am.",
            Self::Question => "Does anyone else name their houseplants?",
            Self::Observation => "The streetlights on my block flicker in sync tonight.",
            Self::Fragment => "three tabs open. none of them the right one",
            Self::Reflection => "Funny how the quiet days end up teaching the most.",
            Self::Metaphor => "My inbox is a tide that never goes out.",
            Self::Declaration => "Tabs are objectively better than spaces.",
            Self::Contrast => "Morning me plans. Night me improvises.",
            Self::Minimal => "nope.",
            Self::List => "today: rain, tea, one good idea.",
        }
    }
}

// ---------------------------------------------------------------------------
// Length buckets
// ---------------------------------------------------------------------------

/// Target length of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBucket {
    /// A few words.
    UltraShort,
    /// One short sentence.
    Short,
    /// One or two sentences.
    Medium,
    /// Two or three sentences.
    MediumLong,
    /// A full post.
    Long,
}

impl LengthBucket {
    /// Every bucket, shortest first.
    pub const ALL: [Self; 5] = [
        Self::UltraShort,
        Self::Short,
        Self::Medium,
        Self::MediumLong,
        Self::Long,
    ];

    /// Sampling weights, aligned with [`LengthBucket::ALL`].
    pub const WEIGHTS: [f64; 5] = [0.10, 0.20, 0.20, 0.30, 0.20];

    /// Length guidance for the generator.
    pub const fn guidance(self) -> &'static str {
        match self {
            Self::UltraShort => "Keep it to a handful of words.",
            Self::Short => "Keep it to one short sentence.",
            Self::Medium => "Use one or two sentences.",
            Self::MediumLong => "Use two or three sentences.",
            Self::Long => "Use the full length of a post, several sentences.",
        }
    }

    /// Upper bound on characters for the bucket.
    pub const fn max_chars(self) -> u32 {
        match self {
            Self::UltraShort => 40,
            Self::Short => 100,
            Self::Medium => 180,
            Self::MediumLong => 240,
            Self::Long => 280,
        }
    }

    /// Whether the bucket leaves room for elaboration.
    pub const fn allows_elaboration(self) -> bool {
        matches!(self, Self::Medium | Self::MediumLong | Self::Long)
    }
}

// ---------------------------------------------------------------------------
// Directive catalogs
// ---------------------------------------------------------------------------

/// Elaboration directives for medium and longer posts.
pub const ELABORATIONS: [&str; 3] = [
    "Develop the thought with one concrete detail.",
    "Add a brief example that grounds the idea.",
    "Take the idea one step further than expected.",
];

/// Stylistic constraints; at most one is applied per request.
pub const CONSTRAINTS: [&str; 7] = [
    "Do not use any hashtags.",
    "Do not start with the word \"I\".",
    "Use at most one emoji.",
    "Do not ask a question.",
    "Write entirely in lowercase.",
    "Mention a specific number or time.",
    "Avoid exclamation marks.",
];

// ---------------------------------------------------------------------------
// Shaping
// ---------------------------------------------------------------------------

/// A base instruction after shaping, with the choices that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShapedInstruction {
    /// Final instruction text; always starts with the base instruction.
    pub text: String,
    /// Chosen style, `None` when the base passed through.
    pub style: Option<PostStyle>,
    /// Chosen length bucket, `None` when the base passed through.
    pub length: Option<LengthBucket>,
    /// Elaboration directive, if one was added.
    pub elaboration: Option<&'static str>,
    /// Stylistic constraint, if one was added.
    pub constraint: Option<&'static str>,
}

impl ShapedInstruction {
    /// The base instruction, unmodified.
    pub fn passthrough(base: &str) -> Self {
        Self {
            text: base.to_owned(),
            style: None,
            length: None,
            elaboration: None,
            constraint: None,
        }
    }
}

/// Shape `base` with randomly chosen structural directives.
///
/// With probability 0.2 the base passes through unmodified. Otherwise a
/// style and a length bucket are appended with one example; medium and
/// longer buckets get an elaboration directive with probability 0.4; and
/// one stylistic constraint is added with probability 0.4.
pub fn shape_instruction<R: Rng + ?Sized>(base: &str, rng: &mut R) -> ShapedInstruction {
    if !rng.random_bool(SHAPE_PROBABILITY) {
        return ShapedInstruction::passthrough(base);
    }

    let style = PostStyle::ALL
        .choose(rng)
        .copied()
        .unwrap_or(PostStyle::Statement);
    let length = WeightedIndex::new(LengthBucket::WEIGHTS)
        .ok()
        .and_then(|dist| LengthBucket::ALL.get(dist.sample(rng)).copied())
        .unwrap_or(LengthBucket::Medium);

    let elaboration = if length.allows_elaboration() && rng.random_bool(ELABORATION_PROBABILITY) {
        ELABORATIONS.choose(rng).copied()
    } else {
        None
    };
    let constraint = if rng.random_bool(CONSTRAINT_PROBABILITY) {
        CONSTRAINTS.choose(rng).copied()
    } else {
        None
    };

    let mut text = base.trim_end().to_owned();
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(&format!(
        "Style: {} Length: {} Example of the style: \"{}\"",
        style.guidance(),
        length.guidance(),
        style.example(),
    ));
    if let Some(directive) = elaboration {
        text.push(' ');
        text.push_str(directive);
    }
    if let Some(rule) = constraint {
        text.push_str(" Constraint: ");
        text.push_str(rule);
    }

    ShapedInstruction {
        text,
        style: Some(style),
        length: Some(length),
        elaboration,
        constraint,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    const BASE: &str = "Write a post about the night sky.";

    #[test]
    fn output_always_extends_the_base() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..500 {
            let shaped = shape_instruction(BASE, &mut rng);
            assert!(shaped.text.starts_with(BASE));
            if shaped.style.is_none() {
                assert_eq!(shaped.text, BASE);
                assert!(shaped.constraint.is_none());
            }
        }
    }

    #[test]
    fn passthrough_rate_is_about_one_in_five() {
        let mut rng = SmallRng::seed_from_u64(7);
        let runs = 10_000_u32;
        let passthrough = (0..runs)
            .filter(|_| shape_instruction(BASE, &mut rng).style.is_none())
            .count();
        let rate = f64::from(u32::try_from(passthrough).unwrap_or(0)) / f64::from(runs);
        assert!((0.17..0.23).contains(&rate), "rate was {rate}");
    }

    #[test]
    fn elaboration_only_for_roomy_buckets() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut saw_elaboration = false;
        for _ in 0..2_000 {
            let shaped = shape_instruction(BASE, &mut rng);
            if shaped.elaboration.is_some() {
                saw_elaboration = true;
                assert!(shaped.length.is_some_and(LengthBucket::allows_elaboration));
            }
        }
        assert!(saw_elaboration);
    }

    #[test]
    fn at_most_one_constraint_is_applied() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..1_000 {
            let shaped = shape_instruction(BASE, &mut rng);
            let applied = CONSTRAINTS
                .iter()
                .filter(|rule| shaped.text.contains(*rule))
                .count();
            assert!(applied <= 1);
        }
    }

    #[test]
    fn long_buckets_are_most_common() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut counts = [0_u32; 5];
        for _ in 0..10_000 {
            if let Some(length) = shape_instruction(BASE, &mut rng).length
                && let Some(slot) = LengthBucket::ALL
                    .iter()
                    .position(|b| *b == length)
                    .and_then(|i| counts.get_mut(i))
            {
                *slot = slot.saturating_add(1);
            }
        }
        let [ultra, short, _, medium_long, _] = counts;
        assert!(medium_long > short);
        assert!(short > ultra);
    }
}
