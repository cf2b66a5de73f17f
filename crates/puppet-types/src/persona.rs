//! Persona description: who an agent is and how it writes.
//!
//! These types are read straight from agent configuration files, so they use
//! the camelCase field names of the JSON schema and default every field that
//! a hand-written config may omit.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable character traits that shape every piece of generated content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct Personality {
    /// Adjectives describing the persona ("curious", "sardonic").
    pub traits: Vec<String>,
    /// Things the persona cares about.
    pub values: Vec<String>,
    /// Free-form description of how the persona talks.
    pub speaking_style: String,
    /// Topics the persona likes to bring up.
    pub interests: Vec<String>,
}

/// Capitalization habit of the persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Capitalization {
    /// Ordinary sentence case.
    #[default]
    Standard,
    /// Everything lowercase.
    Lowercase,
    /// Everything uppercase.
    Uppercase,
    /// No consistent habit.
    Mixed,
}

/// Typical sentence length of the persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SentenceLength {
    /// Short, punchy sentences.
    Short,
    /// Mixed sentence lengths.
    #[default]
    Medium,
    /// Long, winding sentences.
    Long,
}

/// Formatting preferences applied to generated posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct Formatting {
    /// Whether the persona uses hashtags at all.
    pub uses_hashtags: bool,
    /// Free-form hashtag habit ("camelCase", "one at the end").
    pub hashtag_style: String,
    /// Whether the persona uses emojis at all.
    pub uses_emojis: bool,
    /// Fraction of posts carrying an emoji, in `[0, 1]`.
    pub emoji_frequency: f64,
    /// Capitalization habit.
    pub capitalization: Capitalization,
    /// Typical sentence length.
    pub sentence_length: SentenceLength,
}

/// Voice and tone guidance for the content generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export, export_to = "bindings/")]
pub struct StyleGuide {
    /// Narrative voice ("first person, wry").
    pub voice: String,
    /// Emotional tone ("warm", "deadpan").
    pub tone: String,
    /// Formatting habits.
    pub formatting: Formatting,
    /// Topics the persona never posts about.
    pub topics_to_avoid: Vec<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn style_guide_reads_camel_case_with_defaults() {
        let json = r#"{
            "voice": "first person",
            "formatting": { "usesEmojis": true, "capitalization": "lowercase" },
            "topicsToAvoid": ["politics"]
        }"#;
        let guide: StyleGuide = serde_json::from_str(json).unwrap();
        assert_eq!(guide.voice, "first person");
        assert!(guide.formatting.uses_emojis);
        assert!(!guide.formatting.uses_hashtags);
        assert_eq!(guide.formatting.capitalization, Capitalization::Lowercase);
        assert_eq!(guide.formatting.sentence_length, SentenceLength::Medium);
        assert_eq!(guide.topics_to_avoid, vec!["politics".to_owned()]);
    }
}
