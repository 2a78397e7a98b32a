//! Response Extractor
//!
//! Recovers a JSON value from free-form model text. Models wrap JSON in
//! markdown fences, surround it with prose, or emit almost-JSON with single
//! quotes and trailing commas, so extraction is an ordered chain of pure
//! parsers; the first one that yields a value wins:
//!
//! 1. The whole text as JSON
//! 2. The body of the first fenced code block (optionally tagged `json`)
//! 3. The span from the first `{` to the last `}`
//! 4. That same span after light repair (quotes, trailing commas)
//!
//! `interpret` then resolves the value, once, into an `EvaluationResult`.

use regex::Regex;
use sdk::types::{EvaluationResult, UnstructuredResult, Verdict};
use serde_json::Value;
use std::sync::OnceLock;

/// A single extraction strategy
type Parser = fn(&str) -> Option<Value>;

/// Strategies in the order they are tried
const PARSERS: &[(&str, Parser)] = &[
    ("direct", parse_direct),
    ("fenced", parse_fenced),
    ("brace_span", parse_brace_span),
    ("repaired_brace_span", parse_repaired_brace_span),
];

static FENCE_PATTERN: OnceLock<Regex> = OnceLock::new();
static SINGLE_QUOTED_KEY: OnceLock<Regex> = OnceLock::new();
static SINGLE_QUOTED_VALUE: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMA: OnceLock<Regex> = OnceLock::new();

fn fence_pattern() -> &'static Regex {
    FENCE_PATTERN.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)```").expect("Invalid fence pattern")
    })
}

fn single_quoted_key() -> &'static Regex {
    SINGLE_QUOTED_KEY.get_or_init(|| {
        Regex::new(r#"([{,]\s*)'([^'"\\]*)'(\s*:)"#).expect("Invalid single-quoted key pattern")
    })
}

fn single_quoted_value() -> &'static Regex {
    SINGLE_QUOTED_VALUE.get_or_init(|| {
        Regex::new(r#"([:\[,]\s*)'([^'"\\]*)'(\s*[,}\]])"#)
            .expect("Invalid single-quoted value pattern")
    })
}

fn trailing_comma() -> &'static Regex {
    TRAILING_COMMA
        .get_or_init(|| Regex::new(r",(\s*[}\]])").expect("Invalid trailing comma pattern"))
}

/// Extract the first recoverable JSON value from model text.
///
/// Returns `None` only when every strategy fails.
pub fn extract_json(raw: &str) -> Option<Value> {
    for (name, parser) in PARSERS {
        if let Some(value) = parser(raw) {
            tracing::debug!("Extracted model JSON with strategy '{}'", name);
            return Some(value);
        }
    }
    None
}

/// Resolve raw model text into a verdict or an unstructured wrapper.
pub fn interpret(raw: &str) -> EvaluationResult {
    match extract_json(raw) {
        Some(value) => match Verdict::from_value(&value) {
            Some(verdict) => EvaluationResult::Verdict(verdict),
            None => EvaluationResult::Unstructured(UnstructuredResult {
                text_content: raw.to_string(),
                is_json_format: true,
                message: "Response JSON has no numeric 'assessment' field".to_string(),
                recovered: Some(value),
            }),
        },
        None => EvaluationResult::Unstructured(UnstructuredResult {
            text_content: raw.to_string(),
            is_json_format: false,
            message: "Response was not in JSON format; returning raw text".to_string(),
            recovered: None,
        }),
    }
}

fn parse_direct(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

fn parse_fenced(raw: &str) -> Option<Value> {
    let captures = fence_pattern().captures(raw)?;
    let body = captures.get(1)?.as_str().trim();
    serde_json::from_str(body).ok()
}

/// Greedy span: first `{` through last `}`
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

fn parse_brace_span(raw: &str) -> Option<Value> {
    serde_json::from_str(brace_span(raw)?).ok()
}

fn parse_repaired_brace_span(raw: &str) -> Option<Value> {
    let repaired = repair_json(brace_span(raw)?);
    serde_json::from_str(&repaired).ok()
}

/// Normalize single-quoted keys and values to double quotes and drop
/// trailing commas before `}` / `]`.
fn repair_json(span: &str) -> String {
    let keys = single_quoted_key().replace_all(span, "$1\"$2\"$3");
    // Values adjacent to each other share delimiters, so one pass can miss
    // every other element of a list.
    let mut values = single_quoted_value().replace_all(&keys, "$1\"$2\"$3").into_owned();
    values = single_quoted_value()
        .replace_all(&values, "$1\"$2\"$3")
        .into_owned();
    trailing_comma().replace_all(&values, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_json() {
        let value = extract_json(r#"{"assessment": 0.5}"#).unwrap();
        assert_eq!(value, json!({"assessment": 0.5}));
    }

    #[test]
    fn test_fenced_json_block() {
        let value = extract_json("```json\n{\"assessment\":0.8}\n```").unwrap();
        assert_eq!(value, json!({"assessment": 0.8}));
    }

    #[test]
    fn test_untagged_fence_with_surrounding_prose() {
        let raw = "Here is my grading:\n```\n{\"assessment\": 0.3, \"summary\": \"ok\"}\n```\nLet me know.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["summary"], "ok");
    }

    #[test]
    fn test_brace_span_inside_prose() {
        let raw = "The result is {\"assessment\": 0.9, \"checkpoints\": []} as requested.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["assessment"], 0.9);
    }

    #[test]
    fn test_repair_single_quotes_and_trailing_commas() {
        let raw = "Result: {'assessment': 0.4, 'summary': 'Partial work', 'improvements': ['a', 'b',],}";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["assessment"], 0.4);
        assert_eq!(value["summary"], "Partial work");
        assert_eq!(value["improvements"], json!(["a", "b"]));
    }

    #[test]
    fn test_repair_keeps_apostrophes_inside_double_quotes() {
        let raw = r#"{"summary": "It's done", "assessment": 1,}"#;
        let value = extract_json(raw).unwrap();
        assert_eq!(value["summary"], "It's done");
    }

    #[test]
    fn test_not_json_at_all() {
        assert!(extract_json("not json at all").is_none());
        assert!(extract_json("} backwards {").is_none());
    }

    #[test]
    fn test_interpret_wraps_plain_text() {
        match interpret("not json at all") {
            EvaluationResult::Unstructured(u) => {
                assert_eq!(u.text_content, "not json at all");
                assert!(!u.is_json_format);
            }
            other => panic!("expected unstructured result, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_json_without_assessment() {
        match interpret(r#"{"summary": "forgot the score"}"#) {
            EvaluationResult::Unstructured(u) => assert!(u.is_json_format),
            other => panic!("expected unstructured result, got {:?}", other),
        }
    }

    #[test]
    fn test_interpret_fenced_verdict() {
        let result = interpret("```json\n{\"assessment\":0.8}\n```");
        assert_eq!(result.assessment(), Some(0.8));
    }
}
