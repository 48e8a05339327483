//! Subtopic extraction prompt and output cleanup.

use super::truncate_chars;
use crate::report::parse::{extract_json_array, parse_json_lenient};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("valid list marker regex")
});

const SYSTEM: &str = "You are a research planner. You break research questions into focused, \
searchable subtopics. Answer with a JSON array of strings and nothing else.";

pub fn subtopics_prompt(
    query: &str,
    report_content: Option<&str>,
    max: usize,
    context_chars: usize,
) -> (String, String) {
    let mut user = format!(
        "Research query: {}\n\nList up to {} distinct subtopics worth researching separately. \
         Each subtopic should be a short phrase of at most eight words.",
        query.trim(),
        max
    );
    if let Some(content) = report_content.map(str::trim).filter(|c| !c.is_empty()) {
        user.push_str("\n\nBase the subtopics on this report:\n");
        user.push_str(truncate_chars(content, context_chars));
    }
    user.push_str("\n\nRespond with a JSON array, for example [\"first subtopic\", \"second subtopic\"].");
    (SYSTEM.to_string(), user)
}

/// Pull subtopics out of model output: a JSON array if one parses, otherwise list lines.
pub fn parse_subtopics(text: &str, max: usize) -> Vec<String> {
    let raw = extract_json_array(text)
        .and_then(|candidate| parse_json_lenient::<Vec<Value>>(candidate).ok())
        .map(|items| items.into_iter().filter_map(item_text).collect::<Vec<_>>())
        .filter(|items| !items.is_empty())
        .unwrap_or_else(|| list_lines(text));

    let mut seen = HashSet::new();
    raw.iter()
        .map(|item| clean(item))
        .filter(|item| !item.is_empty())
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(max)
        .collect()
}

/// An array item: a string, or an object with a name-like field.
fn item_text(item: Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s),
        Value::Object(map) => ["title", "name", "subtopic", "topic"]
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_str).map(str::to_string)),
        _ => None,
    }
}

fn list_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| LIST_MARKER.is_match(line))
        .map(str::to_string)
        .collect()
}

fn clean(item: &str) -> String {
    let stripped = LIST_MARKER.replace(item, "");
    stripped
        .trim()
        .trim_end_matches(',')
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_json_array() {
        let text = "```json\n[\"Cathode materials\", \"Electrolyte stability\", \"Cost\"]\n```";
        assert_eq!(
            parse_subtopics(text, 6),
            vec!["Cathode materials", "Electrolyte stability", "Cost"]
        );
    }

    #[test]
    fn test_parse_array_of_objects() {
        let text = r#"[{"title": "Policy"}, {"name": "Markets"}, 42]"#;
        assert_eq!(parse_subtopics(text, 6), vec!["Policy", "Markets"]);
    }

    #[test]
    fn test_fallback_to_list_lines() {
        let text = "Here are some subtopics:\n1. \"Thermal runaway\"\n2) Recycling\n- **Supply chain**\nThanks!";
        assert_eq!(
            parse_subtopics(text, 6),
            vec!["Thermal runaway", "Recycling", "Supply chain"]
        );
    }

    #[test]
    fn test_dedupe_case_insensitive_and_truncate() {
        let text = r#"["Safety", "safety ", "", "Cost", "Scale", "Policy"]"#;
        assert_eq!(parse_subtopics(text, 3), vec!["Safety", "Cost", "Scale"]);
    }

    #[test]
    fn test_nothing_extractable() {
        assert!(parse_subtopics("I have no idea.", 6).is_empty());
    }

    #[test]
    fn test_prompt_includes_truncated_report() {
        let report = "r".repeat(50);
        let (_, user) = subtopics_prompt("q", Some(&report), 4, 10);
        assert!(user.contains("up to 4 distinct subtopics"));
        assert!(user.contains(&"r".repeat(10)));
        assert!(!user.contains(&"r".repeat(11)));

        let (_, user) = subtopics_prompt("q", Some("   "), 4, 10);
        assert!(!user.contains("Base the subtopics"));
    }
}
