//! Per-subtopic grounded research: prompt, result type, and answer parsing.

use crate::report::parse::{object_candidates, parse_json_lenient};
use crate::types::WebSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A web page backing a subtopic summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLink {
    pub title: String,
    #[serde(alias = "uri", alias = "link")]
    pub url: String,
}

impl From<WebSource> for SourceLink {
    fn from(web: WebSource) -> Self {
        Self {
            title: web.title,
            url: web.uri,
        }
    }
}

/// Research findings for one subtopic. A failed subtopic carries `error` instead
/// of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtopicResult {
    pub subtopic: String,
    pub summary: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubtopicResult {
    pub fn failed(subtopic: impl Into<String>, error: impl ToString) -> Self {
        Self {
            subtopic: subtopic.into(),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }
}

/// The shape the model is asked to answer with.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScrapePayload {
    summary: String,
    #[serde(alias = "key_findings", alias = "findings")]
    key_findings: Vec<String>,
    sources: Vec<SourceLink>,
}

const SYSTEM: &str = "You are a research assistant with web search. You summarize the current \
state of knowledge on a narrow topic and cite the pages you used.";

pub fn scrape_prompt(query: &str, subtopic: &str) -> (String, String) {
    let user = format!(
        "Main research query: {}\nSubtopic: {}\n\n\
         Search the web for recent, authoritative information on this subtopic in the context of \
         the main query. Respond with a JSON object inside a ```json block:\n\
         {{\"summary\": \"two or three paragraphs\", \"keyFindings\": [\"finding\"], \
         \"sources\": [{{\"title\": \"page title\", \"url\": \"https://...\"}}]}}",
        query.trim(),
        subtopic.trim()
    );
    (SYSTEM.to_string(), user)
}

/// Build a result from the model's answer and the grounding sources of the call.
///
/// Prose without a JSON object becomes the summary. Sources are the model-listed
/// ones followed by grounding sources, first occurrence of each URL kept.
pub fn parse_scrape(subtopic: &str, text: &str, grounding: Vec<WebSource>) -> SubtopicResult {
    let payload = object_candidates(text)
        .into_iter()
        .filter_map(|candidate| parse_json_lenient::<ScrapePayload>(candidate).ok())
        .find(|p| !p.summary.trim().is_empty() || !p.key_findings.is_empty())
        .unwrap_or_else(|| ScrapePayload {
            summary: text.trim().to_string(),
            ..Default::default()
        });

    let mut seen = HashSet::new();
    let sources = payload
        .sources
        .into_iter()
        .chain(grounding.into_iter().map(SourceLink::from))
        .filter(|s| !s.url.trim().is_empty())
        .filter(|s| seen.insert(s.url.clone()))
        .collect();

    SubtopicResult {
        subtopic: subtopic.to_string(),
        summary: payload.summary.trim().to_string(),
        key_findings: payload
            .key_findings
            .into_iter()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect(),
        sources,
        error: None,
    }
}
