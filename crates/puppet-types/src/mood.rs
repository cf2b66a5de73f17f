//! PAD (pleasure/valence, arousal, dominance) emotional state.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lower bound of valence.
pub const VALENCE_MIN: f64 = -1.0;
/// Upper bound of valence.
pub const VALENCE_MAX: f64 = 1.0;
/// Lower bound of arousal and dominance.
pub const INTENSITY_MIN: f64 = 0.0;
/// Upper bound of arousal and dominance.
pub const INTENSITY_MAX: f64 = 1.0;

/// Current emotional state of an agent.
///
/// Valence lies in `[-1, 1]`, arousal and dominance in `[0, 1]`. The state
/// only ever moves by additive deltas that are clamped back into range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Mood {
    /// Negative to positive feeling.
    pub valence: f64,
    /// Calm to excited.
    pub arousal: f64,
    /// Submissive to in control.
    pub dominance: f64,
}

impl Default for Mood {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.0,
            dominance: 0.5,
        }
    }
}

/// Signed change to apply to a [`Mood`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MoodDelta {
    /// Change in valence.
    pub valence: f64,
    /// Change in arousal.
    pub arousal: f64,
    /// Change in dominance.
    pub dominance: f64,
}

impl MoodDelta {
    /// Build a delta from its three components.
    pub const fn new(valence: f64, arousal: f64, dominance: f64) -> Self {
        Self {
            valence,
            arousal,
            dominance,
        }
    }
}
