//! Structured output extraction
//!
//! Generation backends are asked for bare JSON but routinely wrap it in
//! prose or markdown fences. Extraction tries progressively looser readings
//! of the text and keeps the first that parses to an object or array.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no valid JSON found")]
    NoValidJson,
}

/// Extract a JSON object or array from generated text
///
/// Stages, first success wins:
/// 1. the whole trimmed text
/// 2. the body of the first fenced block
/// 3. first `{` through last `}`
/// 4. first `[` through last `]`
pub fn extract(text: &str) -> Result<Value, ExtractionError> {
    debug!(text_len = text.len(), "extract: called");

    if let Some(value) = parse_structured(text.trim()) {
        debug!("extract: parsed whole text");
        return Ok(value);
    }

    if let Some(inner) = FENCED_RE.captures(text).and_then(|c| c.get(1))
        && let Some(value) = parse_structured(inner.as_str().trim())
    {
        debug!("extract: parsed fenced block");
        return Ok(value);
    }

    if let Some(value) = between(text, '{', '}').and_then(parse_structured) {
        debug!("extract: parsed brace span");
        return Ok(value);
    }

    if let Some(value) = between(text, '[', ']').and_then(parse_structured) {
        debug!("extract: parsed bracket span");
        return Ok(value);
    }

    debug!("extract: no valid JSON");
    Err(ExtractionError::NoValidJson)
}

/// Parse `s`, accepting only objects and arrays
fn parse_structured(s: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(s) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

/// Substring from the first `open` through the last `close`, inclusive
fn between(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_whole_text() {
        assert_eq!(extract(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(extract("  [1, 2]\n").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_fenced_block() {
        assert_eq!(extract("```json\n{\"a\":1}\n```").unwrap(), json!({"a": 1}));
        assert_eq!(extract("Here you go:\n```\n[{\"exercise\": \"squat\"}]\n```\nEnjoy").unwrap(), json!([{"exercise": "squat"}]));
    }

    #[test]
    fn test_brace_span_in_noise() {
        assert_eq!(extract(r#"noise {"a":1} noise"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_bracket_span_in_noise() {
        assert_eq!(extract("Plan: [1, 2, 3] done").unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_broken_fence_falls_through_to_braces() {
        let text = "```json\n{\"a\": oops}\n```\nCorrected: {\"a\": 2}";
        // The fence body is invalid and the brace span covers both objects, so
        // only a later stage could succeed; neither does here.
        assert_eq!(extract(text), Err(ExtractionError::NoValidJson));

        let text = "```\nnot json\n```\n{\"a\": 2}";
        assert_eq!(extract(text).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn test_brace_span_preferred_over_brackets() {
        let text = r#"result: {"days": [1, 2]} trailing"#;
        assert_eq!(extract(text).unwrap(), json!({"days": [1, 2]}));
    }

    #[test]
    fn test_failures() {
        assert_eq!(extract("not json at all"), Err(ExtractionError::NoValidJson));
        assert_eq!(extract(""), Err(ExtractionError::NoValidJson));
        assert_eq!(extract("} backwards {"), Err(ExtractionError::NoValidJson));
        assert_eq!(ExtractionError::NoValidJson.to_string(), "no valid JSON found");
    }

    #[test]
    fn test_scalars_rejected() {
        assert_eq!(extract("42"), Err(ExtractionError::NoValidJson));
        assert_eq!(extract("\"just a string\""), Err(ExtractionError::NoValidJson));
        assert_eq!(extract("null"), Err(ExtractionError::NoValidJson));
    }

    proptest! {
        #[test]
        fn object_survives_surrounding_prose(
            map in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 1..6),
            prefix in "[a-zA-Z .,:]{0,40}",
            suffix in "[a-zA-Z .,:]{0,40}",
        ) {
            let value = serde_json::to_value(&map).unwrap();
            let text = format!("{}{}{}", prefix, value, suffix);
            prop_assert_eq!(extract(&text).unwrap(), value);
        }
    }
}
