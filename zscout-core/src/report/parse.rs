//! Extraction of JSON payloads from markdown-wrapped model output.
//!
//! Grounded Gemini calls cannot use JSON mode, so reports arrive as prose with a
//! fenced JSON block somewhere inside. Candidates are tried in order: the
//! ```` ```json ```` fence up to the last closing fence, the same fence up to the
//! nearest closing fence, an untagged fence holding an object, and finally the
//! span from the first `{` to the last `}`.

use super::types::Report;
use crate::error::ReportError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::LazyLock;

const PREVIEW_CHARS: usize = 120;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```json[ \t]*\r?\n?").expect("valid json fence regex"));

static UNTAGGED_OBJECT_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*\r?\n(\{.*\})\s*```").expect("valid untagged fence regex")
});

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing comma regex"));

/// Parse a [`Report`] out of raw model output.
pub fn parse_report(text: &str) -> Result<Report, ReportError> {
    let candidates = object_candidates(text);
    if candidates.is_empty() {
        return Err(ReportError::NoJsonFound {
            preview: preview(text),
        });
    }

    let mut first_error = None;
    let mut saw_empty = false;
    for candidate in &candidates {
        match parse_json_lenient::<Value>(candidate)
            .map_err(|e| e.to_string())
            .and_then(value_to_report)
        {
            Ok(report) if report.is_empty() => saw_empty = true,
            Ok(report) => return Ok(report),
            Err(message) => {
                first_error.get_or_insert(message);
            }
        }
    }

    if saw_empty {
        return Err(ReportError::EmptyReport);
    }
    Err(ReportError::InvalidJson {
        message: first_error.unwrap_or_default(),
        preview: preview(text),
    })
}

/// Convert a parsed value into a report, unwrapping a `{"report": {...}}` envelope.
fn value_to_report(value: Value) -> Result<Report, String> {
    let value = match value {
        Value::Object(mut map) if map.len() == 1 && map.get("report").is_some_and(Value::is_object) => {
            map.remove("report").unwrap_or(Value::Null)
        }
        other => other,
    };
    if !value.is_object() {
        return Err("expected a JSON object".to_string());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

/// Candidate JSON object substrings, most specific first, without duplicates.
pub fn object_candidates<'a>(text: &'a str) -> Vec<&'a str> {
    let mut candidates: Vec<&'a str> = Vec::new();
    let mut push = |c: &'a str| {
        let c = c.trim();
        if c.starts_with('{') && !candidates.contains(&c) {
            candidates.push(c);
        }
    };

    for body in fenced_json_bodies(text) {
        push(body);
    }
    if let Some(caps) = UNTAGGED_OBJECT_FENCE.captures(text)
        && let Some(body) = caps.get(1)
    {
        push(body.as_str());
    }
    if let Some(span) = delimited_span(text, '{', '}') {
        push(span);
    }
    candidates
}

/// Extract the best JSON array substring (for list-shaped answers).
pub fn extract_json_array(text: &str) -> Option<&str> {
    fenced_json_bodies(text)
        .into_iter()
        .map(str::trim)
        .find(|body| body.starts_with('['))
        .or_else(|| delimited_span(text, '[', ']'))
}

/// Deserialize JSON, retrying once with trailing commas removed.
pub fn parse_json_lenient<T: DeserializeOwned>(candidate: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str(candidate) {
        Ok(value) => Ok(value),
        Err(first) => {
            let repaired = TRAILING_COMMA.replace_all(candidate, "$1");
            if repaired == candidate {
                return Err(first);
            }
            serde_json::from_str(&repaired).map_err(|_| first)
        }
    }
}

/// Bodies of the first ```` ```json ```` fence: up to the last closing fence, then
/// up to the nearest one.
fn fenced_json_bodies(text: &str) -> Vec<&str> {
    let Some(open) = JSON_FENCE.find(text) else {
        return Vec::new();
    };
    let rest = &text[open.end()..];
    let mut bodies = Vec::with_capacity(2);
    if let Some(last) = rest.rfind("```") {
        bodies.push(&rest[..last]);
    }
    if let Some(nearest) = rest.find("```") {
        if bodies.first() != Some(&&rest[..nearest]) {
            bodies.push(&rest[..nearest]);
        }
    }
    if bodies.is_empty() {
        // Unterminated fence: the model ran out of tokens mid-block.
        bodies.push(rest);
    }
    bodies
}

/// The span from the first `open` to the last `close`, inclusive.
fn delimited_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// The first few characters of model output, for error messages.
pub fn preview(text: &str) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    if trimmed.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}
