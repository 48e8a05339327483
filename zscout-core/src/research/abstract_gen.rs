//! Abstract prompt and cleanup of the model's answer.

use super::truncate_chars;
use crate::report::Section;
use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$").expect("valid code fence regex"));

static ABSTRACT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:#+\s*\**abstract\b\**\s*[:.\-]?|\*+abstract\b\s*[:.\-]?\s*\*+\s*[:.\-]?|abstract\s*(?::|[.\-](?:\s|$)))\s*",
    )
    .expect("valid abstract prefix regex")
});

const SYSTEM: &str = "You are a scientific editor. You write concise, accurate abstracts \
in plain prose without headings, lists, or markdown.";

pub fn abstract_prompt(
    title: &str,
    sections: &[Section],
    query: Option<&str>,
    section_chars: usize,
    words: usize,
) -> (String, String) {
    let mut user = format!(
        "Write an abstract of about {} words for the following research report.\n",
        words
    );
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        user.push_str(&format!("The report answers the query: {}\n", query));
    }
    user.push_str(&format!("\nTitle: {}\n", title.trim()));
    for section in sections {
        user.push_str(&format!(
            "\n## {}\n{}\n",
            section.title.trim(),
            truncate_chars(section.content.trim(), section_chars)
        ));
    }
    user.push_str("\nRespond with the abstract text only.");
    (SYSTEM.to_string(), user)
}

/// Strip fences, wrapping quotes, and an `Abstract:` label from the model's answer.
pub fn clean_abstract(text: &str) -> String {
    let without_fences = CODE_FENCE.replace_all(text, "");
    let trimmed = without_fences.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(trimmed);
    ABSTRACT_PREFIX.replace(unquoted.trim(), "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_plain_text_untouched() {
        assert_eq!(clean_abstract("  We study X.  "), "We study X.");
    }

    #[test]
    fn test_clean_strips_fences_quotes_and_label() {
        assert_eq!(clean_abstract("```text\n\"Abstract: We study X.\"\n```"), "We study X.");
        assert_eq!(clean_abstract("**Abstract:** We study Y."), "We study Y.");
        assert_eq!(clean_abstract("## Abstract\nWe study Z."), "We study Z.");
    }

    #[test]
    fn test_clean_keeps_words_starting_with_abstract() {
        assert_eq!(
            clean_abstract("Abstraction layers matter."),
            "Abstraction layers matter."
        );
    }

    #[test]
    fn test_clean_keeps_leading_word_abstract() {
        assert_eq!(
            clean_abstract("Abstract algebra underpins modern public-key cryptography."),
            "Abstract algebra underpins modern public-key cryptography."
        );
        assert_eq!(
            clean_abstract("Abstract-level reasoning helps."),
            "Abstract-level reasoning helps."
        );
        assert_eq!(clean_abstract("**Abstract**: We study W."), "We study W.");
        assert_eq!(clean_abstract("ABSTRACT - We study V."), "We study V.");
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean_abstract("```\n```"), "");
    }

    #[test]
    fn test_prompt_truncates_sections() {
        let sections = vec![Section::new("Intro", "y".repeat(100))];
        let (_, user) = abstract_prompt("Title", &sections, Some("why"), 20, 150);
        assert!(user.contains("about 150 words"));
        assert!(user.contains("The report answers the query: why"));
        assert!(user.contains(&"y".repeat(20)));
        assert!(!user.contains(&"y".repeat(21)));
    }
}
