//! Response normalisation: raw model text → [`StructuredResult`].
//!
//! ## Why is this necessary?
//!
//! The Summarize and Compare prompts ask for bare JSON, but models regularly
//! wrap the answer in a ```` ```json ```` fence, prepend a sentence, or give
//! up and answer in prose. None of that is a system fault. [`normalize`]
//! repairs the one artefact that is safe to repair (a single outer fence)
//! and turns everything else into an inspectable fallback.
//!
//! ## Rules
//!
//! 1. Trim surrounding whitespace. Nothing left → `empty_response`.
//! 2. If the text starts with ```` ``` ````, it must be exactly one fenced
//!    block: an opening fence with an optional language tag, a newline, the
//!    body, and a closing fence at the very end. The fences are removed.
//!    An opening fence without a closing one is `unterminated_fence`; an
//!    opening line with anything besides a language tag is `malformed_fence`.
//!    Fences nested inside the body are left alone and will fail to parse.
//! 3. Parse the body as JSON. An object is returned as-is, without checking
//!    field names. Any other JSON value is `not_an_object`; a syntax error is
//!    `invalid_json`.
//!
//! A fallback always carries the caller's original, untrimmed text.

use crate::output::StructuredResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

const FENCE: &str = "```";

/// Opening fence (optional language tag), body, closing fence at end of input.
static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A```([A-Za-z0-9_+.\-]*)[ \t]*\r?\n(.*)```\z").unwrap());

/// Why an answer could not be turned into an object.
///
/// The `Display` form (`code` or `code: detail`) is what lands in
/// [`StructuredResult::Fallback::reason`]; the code prefix is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    EmptyResponse,
    UnterminatedFence,
    MalformedFence,
    InvalidJson(String),
    NotAnObject(&'static str),
}

impl FallbackReason {
    pub fn code(&self) -> &'static str {
        match self {
            FallbackReason::EmptyResponse => "empty_response",
            FallbackReason::UnterminatedFence => "unterminated_fence",
            FallbackReason::MalformedFence => "malformed_fence",
            FallbackReason::InvalidJson(_) => "invalid_json",
            FallbackReason::NotAnObject(_) => "not_an_object",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InvalidJson(detail) => write!(f, "{}: {}", self.code(), detail),
            FallbackReason::NotAnObject(kind) => write!(f, "{}: got {}", self.code(), kind),
            _ => f.write_str(self.code()),
        }
    }
}

/// Normalise a raw model answer. Total: never panics, never errors.
pub fn normalize(raw: &str) -> StructuredResult {
    match parse_object(raw) {
        Ok(data) => {
            debug!("Normalised response: {} top-level fields", data.len());
            StructuredResult::Ok { data }
        }
        Err(reason) => {
            warn!("Model response kept as fallback: {}", reason);
            StructuredResult::Fallback {
                reason: reason.to_string(),
                raw: raw.to_string(),
            }
        }
    }
}

fn parse_object(raw: &str) -> Result<serde_json::Map<String, Value>, FallbackReason> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FallbackReason::EmptyResponse);
    }

    let body = strip_outer_fence(trimmed)?;

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FallbackReason::NotAnObject(json_type(&other))),
        Err(e) => Err(FallbackReason::InvalidJson(e.to_string())),
    }
}

/// Remove one outer fence pair, if the text starts with a fence.
fn strip_outer_fence(trimmed: &str) -> Result<&str, FallbackReason> {
    if !trimmed.starts_with(FENCE) {
        return Ok(trimmed);
    }
    if let Some(caps) = RE_OUTER_FENCE.captures(trimmed) {
        return Ok(caps.get(2).map_or("", |m| m.as_str()));
    }

    let opening_line = trimmed.lines().next().unwrap_or_default();
    let closes = trimmed.len() > FENCE.len() && trimmed.ends_with(FENCE);
    if !trimmed.contains('\n') || !closes {
        // "```json" alone, or a fence that is never closed.
        if is_fence_tag(&opening_line[FENCE.len()..]) && !closes {
            return Err(FallbackReason::UnterminatedFence);
        }
    }
    Err(FallbackReason::MalformedFence)
}

fn is_fence_tag(s: &str) -> bool {
    s.trim_end()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '.' | '-'))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reason_code(r: &StructuredResult) -> &str {
        match r {
            StructuredResult::Fallback { reason, .. } => reason.split(':').next().unwrap(),
            StructuredResult::Ok { .. } => panic!("expected fallback, got {r:?}"),
        }
    }

    #[test]
    fn fenced_json_scenario() {
        let raw = "```json\n{\"skills\":[\"Go\"],\"projects\":[],\"certifications\":[],\"objective\":\"x\"}\n```";
        let r = normalize(raw);
        let expected = json!({"skills": ["Go"], "projects": [], "certifications": [], "objective": "x"});
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"status": "ok", "data": expected})
        );
    }

    #[test]
    fn prose_scenario() {
        let r = normalize("Not JSON at all");
        match &r {
            StructuredResult::Fallback { reason, raw } => {
                assert!(!reason.is_empty());
                assert!(reason.starts_with("invalid_json"));
                assert_eq!(raw, "Not JSON at all");
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn bare_object_round_trips() {
        let value = json!({"existing_skills": ["Rust"], "missing_skills": [], "roadmap": [{"month": 1, "task": "t", "resource": "r", "deliverable": "d"}]});
        let r = normalize(&serde_json::to_string_pretty(&value).unwrap());
        assert_eq!(r.data(), value.as_object());
    }

    #[test]
    fn fence_variants_match_unwrapped() {
        let bare = r#"{"a": 1, "b": [true, null]}"#;
        let expected = normalize(bare);
        assert!(expected.is_ok());
        for wrapped in [
            format!("```json\n{bare}\n```"),
            format!("```\n{bare}\n```"),
            format!("```JSON  \r\n{bare}\r\n```"),
            format!("\n\n  ```json\n{bare}```  \n"),
        ] {
            assert_eq!(normalize(&wrapped), expected, "input: {wrapped:?}");
        }
    }

    #[test]
    fn fallback_keeps_untrimmed_raw() {
        let raw = "  \n```json\n{broken\n```\n\n";
        match normalize(raw) {
            StructuredResult::Fallback { raw: kept, reason } => {
                assert_eq!(kept, raw);
                assert!(reason.starts_with("invalid_json"));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_whitespace() {
        assert_eq!(reason_code(&normalize("")), "empty_response");
        assert_eq!(reason_code(&normalize(" \n\t ")), "empty_response");
    }

    #[test]
    fn unterminated_fence() {
        assert_eq!(
            reason_code(&normalize("```json\n{\"a\": 1}")),
            "unterminated_fence"
        );
        assert_eq!(reason_code(&normalize("```json")), "unterminated_fence");
    }

    #[test]
    fn malformed_fence() {
        assert_eq!(
            reason_code(&normalize("```json {\"a\": 1}```")),
            "malformed_fence"
        );
        assert_eq!(
            reason_code(&normalize("```json {\"a\": 1}\n```")),
            "malformed_fence"
        );
    }

    #[test]
    fn nested_fences_are_not_repaired() {
        let raw = "```\n```json\n{\"a\": 1}\n```\n```";
        assert_eq!(reason_code(&normalize(raw)), "invalid_json");
    }

    #[test]
    fn non_object_json() {
        assert_eq!(reason_code(&normalize("[1, 2, 3]")), "not_an_object");
        assert_eq!(reason_code(&normalize("\"just a string\"")), "not_an_object");
        assert_eq!(reason_code(&normalize("null")), "not_an_object");
        match normalize("42") {
            StructuredResult::Fallback { reason, .. } => assert_eq!(reason, "not_an_object: got number"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prose_around_json_is_not_guessed_at() {
        let raw = "Here is the summary:\n{\"a\": 1}";
        assert_eq!(reason_code(&normalize(raw)), "invalid_json");
    }

    #[test]
    fn extra_fields_pass_through() {
        let r = normalize(r#"{"objective": "x", "unexpected": {"nested": 1}}"#);
        assert_eq!(r.field("unexpected"), Some(&json!({"nested": 1})));
        assert_eq!(r.field("skills"), None);
    }

    #[test]
    fn total_over_odd_inputs() {
        let long_backticks = "`".repeat(1000);
        let inputs = [
            "```",
            "``",
            "````",
            "```\n```",
            "\u{FEFF}{}",
            "{\"a\":",
            "}}}{{{",
            long_backticks.as_str(),
            "```json\n\u{0}\n```",
            "ü```",
        ];
        for input in inputs {
            let r = normalize(input);
            match &r {
                StructuredResult::Ok { .. } => {}
                StructuredResult::Fallback { reason, raw } => {
                    assert!(!reason.is_empty(), "input {input:?}");
                    assert_eq!(raw, input);
                }
            }
        }
    }
}
