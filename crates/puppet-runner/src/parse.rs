//! LLM response parsing into typed collaborator results.
//!
//! This is the only place free text turns into structure. A response is
//! read as a JSON object when possible (raw, inside a markdown code block,
//! or after stripping trailing commas) and otherwise as line-prefixed
//! fields such as `ACTION: reply` or `IMPORTANCE: 0.8`. Every number is
//! clamped into its contract range before it leaves this module.

use serde_json::{Map, Value};

use puppet_types::{MemoryUpdate, ReactionAction, ReactionDecision, RelationshipUpdate};

use crate::error::RunnerError;

/// Field names recognized in line-prefixed responses.
const LINE_KEYS: [&str; 11] = [
    "action",
    "content",
    "reasoning",
    "memory",
    "importance",
    "valence",
    "arousal",
    "dominance",
    "sentiment",
    "familiarity",
    "note",
];

/// Importance assumed when a memory update omits it.
const DEFAULT_IMPORTANCE: f64 = 0.5;

/// Parse a reaction judgment.
///
/// A missing action is an error; an action label that is not one of
/// reply, quote, like or ignore becomes [`ReactionAction::Unrecognized`].
pub fn parse_reaction(raw: &str) -> Result<ReactionDecision, RunnerError> {
    let fields = extract_fields(raw)?;
    let label = fields
        .text(&["action", "action_type", "decision"])
        .ok_or_else(|| RunnerError::Parse(format!("reaction without an action: {raw}")))?;
    Ok(ReactionDecision {
        action: ReactionAction::from_label(&label),
        content: fields
            .text(&["content", "text", "reply", "post"])
            .map(|text| strip_quotes(&text).to_owned())
            .filter(|text| !is_placeholder(text)),
        reasoning: fields.text(&["reasoning", "reason"]),
    })
}

/// Parse a memory update. Numbers are clamped; missing deltas are zero.
pub fn parse_memory_update(raw: &str) -> Result<MemoryUpdate, RunnerError> {
    let fields = extract_fields(raw)?;
    let memory_text = fields
        .text(&["memory", "memory_text", "content"])
        .filter(|text| !is_placeholder(text))
        .ok_or_else(|| RunnerError::Parse(format!("memory update without text: {raw}")))?;
    let update = MemoryUpdate {
        memory_text,
        importance: fields.number(&["importance"]).unwrap_or(DEFAULT_IMPORTANCE),
        valence_delta: fields.number(&["valence", "valence_delta"]).unwrap_or(0.0),
        arousal_delta: fields.number(&["arousal", "arousal_delta"]).unwrap_or(0.0),
        dominance_delta: fields.number(&["dominance", "dominance_delta"]).unwrap_or(0.0),
    };
    Ok(update.clamped())
}

/// Parse a relationship update. At least one delta must be present.
pub fn parse_relationship_update(raw: &str) -> Result<RelationshipUpdate, RunnerError> {
    let fields = extract_fields(raw)?;
    let sentiment = fields.number(&["sentiment", "sentiment_delta"]);
    let familiarity = fields.number(&["familiarity", "familiarity_delta"]);
    if sentiment.is_none() && familiarity.is_none() {
        return Err(RunnerError::Parse(format!(
            "relationship update without deltas: {raw}"
        )));
    }
    let update = RelationshipUpdate {
        sentiment_delta: sentiment.unwrap_or(0.0),
        familiarity_delta: familiarity.unwrap_or(0.0),
        note: fields.text(&["note", "notes"]).filter(|note| !is_placeholder(note)),
    };
    Ok(update.clamped())
}

/// Clean generated post text.
///
/// Strips surrounding quotes and an echoed `CONTENT:` label, then caps every
/// blank-line-separated part at `max_length` characters. Empty output is an
/// error.
pub fn clean_post_text(raw: &str, max_length: u32) -> Result<String, RunnerError> {
    let mut text = raw.trim();
    if let Some((key, rest)) = text.split_once(':')
        && matches!(key.trim().to_ascii_lowercase().as_str(), "content" | "post" | "tweet")
    {
        text = rest.trim();
    }
    let limit = usize::try_from(max_length).unwrap_or(usize::MAX);
    let parts: Vec<String> = text
        .split("\n\n")
        .map(|part| truncate_chars(strip_quotes(part.trim()), limit))
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        return Err(RunnerError::Parse("empty post text".to_owned()));
    }
    Ok(parts.join("\n\n"))
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Fields read from a response, keyed by lower-case name.
#[derive(Debug, Default)]
struct Fields(Map<String, Value>);

impl Fields {
    /// First non-empty text value among `keys`.
    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }

    /// First finite number among `keys`; numeric strings count.
    fn number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
            Value::String(text) => leading_number(text),
            _ => None,
        })
    }
}

/// Read fields from a response through every recovery strategy.
fn extract_fields(raw: &str) -> Result<Fields, RunnerError> {
    if let Some(object) = parse_json_object(raw) {
        let lowered = object
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        return Ok(Fields(lowered));
    }
    let fields = parse_line_fields(raw);
    if fields.0.is_empty() {
        return Err(RunnerError::Parse(format!(
            "response is neither JSON nor line-prefixed: {}",
            raw.trim()
        )));
    }
    Ok(fields)
}

/// Attempt to parse a JSON object through multiple recovery strategies:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Strip trailing commas and retry
/// 4. Extract from a code block, then strip commas
fn parse_json_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();

    if let Ok(object) = serde_json::from_str(trimmed) {
        return Some(object);
    }

    let block = extract_json_from_codeblock(trimmed);
    if let Some(json_str) = block
        && let Ok(object) = serde_json::from_str(json_str)
    {
        return Some(object);
    }

    if let Ok(object) = serde_json::from_str(&strip_trailing_commas(trimmed)) {
        return Some(object);
    }

    block.and_then(|json_str| serde_json::from_str(&strip_trailing_commas(json_str)).ok())
}

/// Extract JSON content from a markdown code block, or the outermost braces.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let after_fence = text.get(start.saturating_add(3)..)?;
        let content_start = after_fence.find('\n').map_or(0, |i| i.saturating_add(1));
        let content = after_fence.get(content_start..)?;
        let end = content.find("```")?;
        return content.get(..end).map(str::trim);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        text.get(start..=end)
    } else {
        None
    }
}

/// Remove trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_comma = false;
    let mut pending_whitespace = String::new();

    for ch in text.chars() {
        if ch == ',' {
            if pending_comma {
                result.push(',');
                result.push_str(&pending_whitespace);
                pending_whitespace.clear();
            }
            pending_comma = true;
        } else if pending_comma && ch.is_whitespace() {
            pending_whitespace.push(ch);
        } else {
            if pending_comma && ch != '}' && ch != ']' {
                result.push(',');
            }
            result.push_str(&pending_whitespace);
            pending_whitespace.clear();
            pending_comma = false;
            result.push(ch);
        }
    }
    if pending_comma {
        result.push(',');
    }
    result.push_str(&pending_whitespace);
    result
}

/// Read `KEY: value` lines. Lines without a known key continue the
/// previous field.
fn parse_line_fields(raw: &str) -> Fields {
    let mut fields = Map::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        let stripped = line.trim().trim_start_matches(['-', '*']).trim();
        let keyed = stripped.split_once(':').and_then(|(key, value)| {
            let key = key.trim().trim_matches('*').trim().to_ascii_lowercase();
            LINE_KEYS
                .contains(&key.as_str())
                .then(|| (key, value.trim().to_owned()))
        });
        match keyed {
            Some((key, value)) => {
                fields.insert(key.clone(), Value::String(value));
                current = Some(key);
            }
            None => {
                let Some(key) = current.as_ref() else {
                    continue;
                };
                if let Some(Value::String(text)) = fields.get_mut(key) {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(line.trim());
                }
            }
        }
    }
    Fields(fields)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse the first token of `text` as a number ("0.7", "+0.1 (mild)").
fn leading_number(text: &str) -> Option<f64> {
    let token = text.split_whitespace().next()?;
    let token = token.trim_end_matches([',', ';', '.']);
    token
        .trim_start_matches('+')
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Remove one pair of matching surrounding quotes.
fn strip_quotes(text: &str) -> &str {
    for (open, close) in [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    text
}

/// Values models write for "nothing".
fn is_placeholder(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "" | "null" | "none" | "n/a"
    )
}

/// Cut `text` to at most `limit` characters, at a word boundary when one
/// exists in the second half.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let cut: String = text.chars().take(limit).collect();
    if text.chars().nth(limit).is_some_and(char::is_whitespace) {
        return cut.trim_end().to_owned();
    }
    match cut.rfind(char::is_whitespace) {
        Some(space) if space.saturating_mul(2) > cut.len() => {
            cut.get(..space).unwrap_or(&cut).trim_end().to_owned()
        }
        _ => cut,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    #[test]
    fn reaction_from_clean_json() {
        let raw = r#"{"action": "reply", "content": "ha, same", "reasoning": "friendly"}"#;
        let decision = parse_reaction(raw).unwrap();
        assert_eq!(decision.action, ReactionAction::Reply);
        assert_eq!(decision.content.as_deref(), Some("ha, same"));
        assert_eq!(decision.reasoning.as_deref(), Some("friendly"));
    }

    #[test]
    fn reaction_from_fenced_json_with_trailing_comma() {
        let raw = "Sure!\n```json\n{\"action\": \"Like\", \"content\": null,}\n```";
        let decision = parse_reaction(raw).unwrap();
        assert_eq!(decision.action, ReactionAction::Like);
        assert_eq!(decision.content, None);
    }

    #[test]
    fn reaction_from_line_prefixed_text() {
        let raw = "ACTION: quote\nCONTENT: \"this is the take\"\nsecond line\nREASONING: agree";
        let decision = parse_reaction(raw).unwrap();
        assert_eq!(decision.action, ReactionAction::Quote);
        assert_eq!(
            decision.content.as_deref(),
            Some("\"this is the take\"\nsecond line")
        );
        assert_eq!(decision.reasoning.as_deref(), Some("agree"));
    }

    #[test]
    fn unknown_action_is_unrecognized() {
        let decision = parse_reaction("ACTION: retweet-with-gif").unwrap();
        assert_eq!(decision.action, ReactionAction::Unrecognized);
    }

    #[test]
    fn reaction_without_action_fails() {
        assert!(matches!(
            parse_reaction("I think I would reply."),
            Err(RunnerError::Parse(_))
        ));
        assert!(matches!(
            parse_reaction(r#"{"content": "hi"}"#),
            Err(RunnerError::Parse(_))
        ));
    }

    #[test]
    fn memory_update_is_clamped() {
        let raw = r#"{"memory": "A comet lit up the sky", "importance": 1.7, "valence": 0.9, "arousal": "-2", "dominance": 0.1}"#;
        let update = parse_memory_update(raw).unwrap();
        assert_eq!(update.memory_text, "A comet lit up the sky");
        assert_eq!(update.importance, 1.0);
        assert_eq!(update.valence_delta, 0.5);
        assert_eq!(update.arousal_delta, -0.5);
        assert_eq!(update.dominance_delta, 0.1);
    }

    #[test]
    fn memory_update_from_lines_defaults_missing_numbers() {
        let raw = "MEMORY: The market crashed\nIMPORTANCE: 0.8 (big deal)\nVALENCE: -0.3";
        let update = parse_memory_update(raw).unwrap();
        assert_eq!(update.memory_text, "The market crashed");
        assert_eq!(update.importance, 0.8);
        assert_eq!(update.valence_delta, -0.3);
        assert_eq!(update.arousal_delta, 0.0);
        assert_eq!(update.dominance_delta, 0.0);
    }

    #[test]
    fn memory_update_needs_text() {
        assert!(parse_memory_update(r#"{"importance": 0.4}"#).is_err());
    }

    #[test]
    fn relationship_update_is_clamped() {
        let raw = "SENTIMENT: +0.5\nFAMILIARITY: -0.2\nNOTE: funny in replies";
        let update = parse_relationship_update(raw).unwrap();
        assert_eq!(update.sentiment_delta, 0.2);
        assert_eq!(update.familiarity_delta, 0.0);
        assert_eq!(update.note.as_deref(), Some("funny in replies"));
    }

    #[test]
    fn relationship_update_null_note() {
        let raw = r#"{"sentiment_delta": -0.05, "familiarity_delta": 0.02, "note": "none"}"#;
        let update = parse_relationship_update(raw).unwrap();
        assert_eq!(update.sentiment_delta, -0.05);
        assert_eq!(update.familiarity_delta, 0.02);
        assert_eq!(update.note, None);
    }

    #[test]
    fn relationship_update_without_numbers_fails() {
        assert!(parse_relationship_update("NOTE: nice").is_err());
    }

    #[test]
    fn post_text_loses_quotes_and_label() {
        assert_eq!(
            clean_post_text("  \"clear skies tonight\"  ", 280).unwrap(),
            "clear skies tonight"
        );
        assert_eq!(
            clean_post_text("Tweet: gm to everyone", 280).unwrap(),
            "gm to everyone"
        );
    }

    #[test]
    fn post_text_keeps_thread_parts_and_caps_each() {
        let raw = "first part of the thread\n\nsecond part that is much too long to fit";
        let cleaned = clean_post_text(raw, 24).unwrap();
        assert_eq!(cleaned, "first part of the thread\n\nsecond part that is much");
        assert_eq!(clean_post_text("one two three", 9).unwrap(), "one two");
    }

    #[test]
    fn empty_post_text_fails() {
        assert!(clean_post_text("  \"\"  ", 100).is_err());
    }

    #[test]
    fn trailing_commas_are_stripped() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, }"#), r#"{"a": 1 }"#);
        assert_eq!(strip_trailing_commas("[1, 2,]"), "[1, 2]");
        assert_eq!(strip_trailing_commas(r#"{"a": "x,y"}"#), r#"{"a": "x,y"}"#);
    }
}
