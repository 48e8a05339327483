//! Research handlers that sit beside report generation.
//!
//! Each handler module owns its prompt and output cleanup; [`ResearchEngine`]
//! performs the model calls and is what the gateway and the CLI hold.

pub mod abstract_gen;
pub mod chat;
pub mod engine;
pub mod scrape;
pub mod subtopics;

pub use chat::ChatReply;
pub use engine::ResearchEngine;
pub use scrape::{SourceLink, SubtopicResult};

/// The longest prefix of `text` holding at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
