//! Recover a [`SanitizeResult`] from a free-form model completion.
//!
//! Small models are asked for JSON but regularly wrap it in code fences, surround
//! it with prose, or emit something that is almost JSON. The completion is
//! cleaned once, then handed to an ordered list of strategies. The first one
//! that produces a result wins; the last one always does.
//!
//! Cleaning only removes fence markers, never content, so an object that shares
//! a line with a fence is still found by the slice.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::types::SanitizeResult;

/// A recovery attempt over cleaned completion text.
pub type Strategy = fn(&str) -> Option<SanitizeResult>;

/// Strategies in the order they are tried.
pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("object_slice", object_slice),
    ("whole_document", whole_document),
    ("field_patterns", field_patterns),
    ("verbatim", verbatim),
];

const FIELDS: [&str; 3] = ["Masked", "Rephrased", "Synthetic"];

/// `"Field": "value"` matchers, in `FIELDS` order
static FIELD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FIELDS
        .iter()
        .map(|field| {
            Regex::new(&format!(r#""{field}"\s*:\s*"((?:[^"\\]|\\.)*)""#))
                .expect("field pattern is a valid regex")
        })
        .collect()
});

/// Turn a raw completion into a result. Never fails.
pub fn recover(raw: &str) -> SanitizeResult {
    let cleaned = clean(raw);

    for (name, strategy) in STRATEGIES {
        if let Some(result) = strategy(&cleaned) {
            debug!("Recovered model output with strategy {}", name);
            return result;
        }
    }

    SanitizeResult::uniform(&cleaned)
}

/// Trim and remove a leading and/or trailing code fence.
///
/// An opening fence line is dropped only when it holds nothing but the fence and
/// its language tag. Otherwise just the backticks go.
pub fn clean(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.split_once('\n') {
            Some((tag, body)) if is_fence_tag(tag) => body,
            None if is_fence_tag(rest) => "",
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim().to_string()
}

fn is_fence_tag(tag: &str) -> bool {
    tag.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.'))
}

/// The whole text parses as JSON.
///
/// An object yields its fields. Any other JSON value (a bare string, an array
/// without an object inside) is valid but unstructured, so the text is used as-is.
/// Runs after `object_slice`, which already took any embedded object.
pub fn whole_document(text: &str) -> Option<SanitizeResult> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(SanitizeResult::from_object(&object)),
        _ => Some(SanitizeResult::uniform(text)),
    }
}

/// An object is embedded in prose: take everything from the first `{` to the last `}`.
pub fn object_slice(text: &str) -> Option<SanitizeResult> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&text[start..=end]).ok()? {
        Value::Object(object) => Some(SanitizeResult::from_object(&object)),
        _ => None,
    }
}

/// Malformed JSON that still contains `"Field": "value"` pairs.
///
/// Each field is looked up on its own; fields that are not found fall back to the
/// full text. Gives up when nothing matched at all.
pub fn field_patterns(text: &str) -> Option<SanitizeResult> {
    let mut values: Vec<Option<String>> = Vec::with_capacity(FIELDS.len());

    for pattern in FIELD_PATTERNS.iter() {
        values.push(
            pattern
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| unescape(m.as_str())),
        );
    }

    if values.iter().all(Option::is_none) {
        return None;
    }

    let mut values = values
        .into_iter()
        .map(|value| value.unwrap_or_else(|| text.to_string()));

    Some(SanitizeResult {
        masked: values.next().unwrap_or_default(),
        rephrased: values.next().unwrap_or_default(),
        synthetic: values.next().unwrap_or_default(),
    })
}

/// Last resort: the cleaned text in every field.
pub fn verbatim(text: &str) -> Option<SanitizeResult> {
    Some(SanitizeResult::uniform(text))
}

/// Decode JSON string escapes in a captured value, keeping it raw if that fails.
fn unescape(captured: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{captured}\""))
        .unwrap_or_else(|_| captured.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_strips_fences() {
        assert_eq!(clean("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(clean("```\n{}\n```"), "{}");
        assert_eq!(clean("  plain  "), "plain");
    }

    #[test]
    fn test_clean_only_trailing_fence() {
        assert_eq!(clean("{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_clean_lone_fence() {
        assert_eq!(clean("```"), "");
        assert_eq!(clean("```json"), "");
    }

    #[test]
    fn test_clean_keeps_content_on_fence_lines() {
        assert_eq!(clean("```json\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(clean("```json {\"a\": 1} ```"), "json {\"a\": 1}");
    }

    #[test]
    fn test_field_patterns_compiled() {
        assert_eq!(FIELD_PATTERNS.len(), FIELDS.len());
    }

    #[test]
    fn test_whole_document_object() {
        let result =
            whole_document(r#"{"Masked": "[NAME]", "Rephrased": "r", "Synthetic": "s"}"#).unwrap();
        assert_eq!(result.masked, "[NAME]");
        assert_eq!(result.rephrased, "r");
        assert_eq!(result.synthetic, "s");
    }

    #[test]
    fn test_whole_document_non_object() {
        let result = whole_document(r#"["a", "b"]"#).unwrap();
        assert_eq!(result, SanitizeResult::uniform(r#"["a", "b"]"#));
    }

    #[test]
    fn test_whole_document_rejects_prose() {
        assert!(whole_document("Sure! {\"Masked\": \"x\"}").is_none());
    }

    #[test]
    fn test_object_slice() {
        let text = "Here you go:\n{\"Masked\": \"m\", \"Rephrased\": \"r\", \"Synthetic\": \"s\"}\nHope it helps.";
        let result = object_slice(text).unwrap();
        assert_eq!(result.masked, "m");
        assert_eq!(result.synthetic, "s");
    }

    #[test]
    fn test_object_slice_without_braces() {
        assert!(object_slice("no braces here").is_none());
        assert!(object_slice("} backwards {").is_none());
    }

    #[test]
    fn test_field_patterns_partial() {
        let text = r#"{"Masked": "Hi [NAME]", "Rephrased": "Hello there" oops"#;
        let result = field_patterns(text).unwrap();
        assert_eq!(result.masked, "Hi [NAME]");
        assert_eq!(result.rephrased, "Hello there");
        assert_eq!(result.synthetic, text);
    }

    #[test]
    fn test_field_patterns_escaped_quote() {
        let text = r#"{"Masked": "say \"hi\" [NAME]",,}"#;
        let result = field_patterns(text).unwrap();
        assert_eq!(result.masked, r#"say "hi" [NAME]"#);
    }

    #[test]
    fn test_field_patterns_nothing_matched() {
        assert!(field_patterns("just words").is_none());
    }

    #[test]
    fn test_strategy_order() {
        let names: Vec<&str> = STRATEGIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["object_slice", "whole_document", "field_patterns", "verbatim"]
        );
    }

    #[test]
    fn test_recover_empty() {
        assert_eq!(recover(""), SanitizeResult::uniform(""));
        assert_eq!(recover("   \n "), SanitizeResult::uniform(""));
    }
}
