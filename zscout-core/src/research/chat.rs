//! Follow-up chat over a finished report.

use super::truncate_chars;
use crate::error::{Result, ZScoutError};
use crate::report::Report;
use crate::types::{Message, Role, WebSource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub sources: Vec<WebSource>,
}

const BASE_SYSTEM: &str = "You are Z-Scout, a research assistant. Answer the user's questions \
accurately and concisely. When a report is provided, ground your answers in it and say so when \
the report does not cover the question.";

/// The last message must be a non-empty user turn.
pub fn validate_messages(messages: &[Message]) -> Result<()> {
    match messages.last() {
        None => Err(ZScoutError::invalid_input("messages must not be empty")),
        Some(last) if last.role != Role::User => Err(ZScoutError::invalid_input(
            "the last message must come from the user",
        )),
        Some(last) if last.content.trim().is_empty() => Err(ZScoutError::invalid_input(
            "the last message must not be empty",
        )),
        Some(_) => Ok(()),
    }
}

/// System instruction with the report (title, then sections) embedded, cut to
/// `context_chars` characters.
pub fn chat_system_prompt(report: Option<&Report>, context_chars: usize) -> String {
    let Some(report) = report.filter(|r| !r.is_empty()) else {
        return BASE_SYSTEM.to_string();
    };

    let mut context = format!("# {}\n", report.title.trim());
    for section in &report.sections {
        context.push_str(&format!("\n## {}\n{}\n", section.title.trim(), section.content.trim()));
    }
    format!(
        "{}\n\nThe user is reading this report:\n\n{}",
        BASE_SYSTEM,
        truncate_chars(&context, context_chars)
    )
}

/// The most recent `limit` messages.
pub fn trim_history(messages: &[Message], limit: usize) -> &[Message] {
    let start = messages.len().saturating_sub(limit.max(1));
    &messages[start..]
}
