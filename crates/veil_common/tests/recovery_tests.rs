//! Recovery behaviour on realistic model completions.

use veil_common::recovery::{clean, recover};
use veil_common::SanitizeResult;

const OBJECT: &str = r#"{"Masked": "My name is [NAME]", "Rephrased": "The user introduced themselves.", "Synthetic": "My name is Alex Carter"}"#;

fn expected() -> SanitizeResult {
    SanitizeResult {
        masked: "My name is [NAME]".to_string(),
        rephrased: "The user introduced themselves.".to_string(),
        synthetic: "My name is Alex Carter".to_string(),
    }
}

#[test]
fn test_well_formed_object_passes_through() {
    assert_eq!(recover(OBJECT), expected());
}

#[test]
fn test_fenced_object_matches_unfenced() {
    let fenced = format!("```json\n{OBJECT}\n```");
    assert_eq!(recover(&fenced), recover(OBJECT));

    let bare_fence = format!("```\n{OBJECT}\n```\n");
    assert_eq!(recover(&bare_fence), expected());
}

#[test]
fn test_prose_around_object() {
    let noisy = format!("Sure, here is the sanitized version:\n\n{OBJECT}\n\nLet me know if you need anything else!");
    assert_eq!(recover(&noisy), expected());
}

#[test]
fn test_pretty_printed_object_inside_fence_with_prose() {
    let completion = "```json\n{\n  \"Masked\": \"Call [PHONE]\",\n  \"Rephrased\": \"Call the office\",\n  \"Synthetic\": \"Call 555-0100\"\n}\n```";
    let result = recover(completion);
    assert_eq!(result.masked, "Call [PHONE]");
    assert_eq!(result.rephrased, "Call the office");
    assert_eq!(result.synthetic, "Call 555-0100");
}

#[test]
fn test_missing_keys_default_to_empty() {
    let result = recover(r#"{"Masked": "only masked"}"#);
    assert_eq!(result.masked, "only masked");
    assert_eq!(result.rephrased, "");
    assert_eq!(result.synthetic, "");
}

#[test]
fn test_malformed_json_uses_field_patterns() {
    // Trailing comma and a missing closing brace defeat the parser
    let completion = r#"{"Masked": "x", "Synthetic": "Jane Doe lives here","#;
    let result = recover(completion);
    assert_eq!(result.masked, "x");
    assert_eq!(result.synthetic, "Jane Doe lives here");
    assert_eq!(result.rephrased, clean(completion));
}

#[test]
fn test_single_quoted_json_falls_back_to_text() {
    let completion = "{'Masked': 'x', 'Rephrased': 'y', 'Synthetic': 'z'}";
    assert_eq!(recover(completion), SanitizeResult::uniform(completion));
}

#[test]
fn test_plain_prose_is_verbatim() {
    let completion = "  I'm sorry, I can't help with that.  ";
    let result = recover(completion);
    assert_eq!(result, SanitizeResult::uniform("I'm sorry, I can't help with that."));
}

#[test]
fn test_json_string_is_verbatim() {
    let completion = r#""My name is [NAME]""#;
    assert_eq!(recover(completion), SanitizeResult::uniform(completion));
}

#[test]
fn test_nested_braces_in_values() {
    let completion = r#"Output: {"Masked": "use {placeholder}", "Rephrased": "r", "Synthetic": "s"} done"#;
    let result = recover(completion);
    assert_eq!(result.masked, "use {placeholder}");
    assert_eq!(result.rephrased, "r");
}

#[test]
fn test_closing_fence_on_object_line() {
    let completion = format!("```json\n{OBJECT}```");
    assert_eq!(recover(&completion), expected());
}

#[test]
fn test_single_line_fenced_object() {
    let completion = format!("```json {OBJECT} ```");
    assert_eq!(recover(&completion), expected());
}

#[test]
fn test_object_inside_array() {
    let completion = format!("[{OBJECT}]");
    assert_eq!(recover(&completion), expected());
}

#[test]
fn test_array_without_object_is_verbatim() {
    let completion = r#"["a", "b"]"#;
    assert_eq!(recover(completion), SanitizeResult::uniform(completion));
}
