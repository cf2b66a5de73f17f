//! Mood updates and descriptions.

use puppet_types::mood::{INTENSITY_MAX, INTENSITY_MIN, VALENCE_MAX, VALENCE_MIN};
use puppet_types::{Mood, MoodDelta};

/// Apply `delta` additively, clamping every component into range.
///
/// Returns the mood before the update.
pub fn apply_delta(mood: &mut Mood, delta: MoodDelta) -> Mood {
    let previous = *mood;
    mood.valence = clamp_component(mood.valence, delta.valence, VALENCE_MIN, VALENCE_MAX);
    mood.arousal = clamp_component(mood.arousal, delta.arousal, INTENSITY_MIN, INTENSITY_MAX);
    mood.dominance = clamp_component(mood.dominance, delta.dominance, INTENSITY_MIN, INTENSITY_MAX);
    previous
}

/// `value + delta` clamped to `[min, max]`; a non-finite delta is ignored.
fn clamp_component(value: f64, delta: f64, min: f64, max: f64) -> f64 {
    if delta.is_finite() {
        (value + delta).clamp(min, max)
    } else {
        value.clamp(min, max)
    }
}

/// Short natural-language description of a mood, used in prompts.
pub fn describe(mood: &Mood) -> String {
    let feeling = if mood.valence > 0.5 {
        "very positive"
    } else if mood.valence > 0.1 {
        "positive"
    } else if mood.valence < -0.5 {
        "very negative"
    } else if mood.valence < -0.1 {
        "negative"
    } else {
        "neutral"
    };
    let energy = if mood.arousal > 0.7 {
        "highly energized"
    } else if mood.arousal > 0.3 {
        "alert"
    } else {
        "calm"
    };
    let control = if mood.dominance > 0.7 {
        "confident"
    } else if mood.dominance < 0.3 {
        "unsure of yourself"
    } else {
        "balanced"
    };
    format!("{feeling}, {energy} and {control}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate() {
        let mut mood = Mood::default();
        let before = apply_delta(&mut mood, MoodDelta::new(0.2, 0.3, -0.1));
        assert_eq!(before, Mood::default());
        assert!((mood.valence - 0.2).abs() < 1e-9);
        assert!((mood.arousal - 0.3).abs() < 1e-9);
        assert!((mood.dominance - 0.4).abs() < 1e-9);
    }

    #[test]
    fn updates_are_clamped() {
        let mut mood = Mood::default();
        for _ in 0..10 {
            apply_delta(&mut mood, MoodDelta::new(0.5, 0.5, 0.5));
        }
        assert!((mood.valence - VALENCE_MAX).abs() < f64::EPSILON);
        assert!((mood.arousal - INTENSITY_MAX).abs() < f64::EPSILON);
        assert!((mood.dominance - INTENSITY_MAX).abs() < f64::EPSILON);

        for _ in 0..10 {
            apply_delta(&mut mood, MoodDelta::new(-0.5, -0.5, -0.5));
        }
        assert!((mood.valence - VALENCE_MIN).abs() < f64::EPSILON);
        assert!((mood.arousal - INTENSITY_MIN).abs() < f64::EPSILON);
        assert!((mood.dominance - INTENSITY_MIN).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let mut mood = Mood::default();
        apply_delta(&mut mood, MoodDelta::new(f64::NAN, f64::INFINITY, 0.0));
        assert_eq!(mood, Mood::default());
    }

    #[test]
    fn describes_default_mood() {
        assert_eq!(describe(&Mood::default()), "neutral, calm and balanced");
    }
}
