//! Prompt templates for report generation.

use super::quality::Shortfall;
use std::fmt::Write as _;

/// Targets the prompt asks the model to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPromptOptions {
    pub sections: usize,
    pub references: usize,
    pub min_chars: usize,
    /// Whether Google Search grounding is attached to the request.
    pub grounding: bool,
}

/// A system instruction and user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPrompt {
    pub system: String,
    pub user: String,
}

const SYSTEM_INSTRUCTION: &str = "You are Z-Scout, a meticulous research analyst. \
You write comprehensive, well-sourced research reports for scientists and engineers. \
You only cite sources that exist and whose URLs resolve. \
You always answer with a single JSON object inside a ```json fenced code block and nothing else.";

const JSON_SHAPE: &str = r#"{
  "title": "string",
  "sections": [
    { "title": "string", "content": "string (several detailed paragraphs, cite references inline as [n])" }
  ],
  "references": [
    { "id": 1, "title": "string", "authors": ["string"], "year": "string", "url": "https://...", "source": "journal, publisher or site" }
  ],
  "suggestedPdfs": [ { "title": "string", "url": "https://...pdf", "description": "string" } ],
  "suggestedImages": [ { "title": "string", "url": "https://...", "description": "string" } ],
  "suggestedDatasets": [ { "title": "string", "url": "https://...", "description": "string", "source": "string" } ]
}"#;

/// The first-attempt prompt for `query`.
pub fn report_prompt(query: &str, options: &ReportPromptOptions) -> ReportPrompt {
    let mut user = String::new();
    let _ = writeln!(user, "Research query: {}\n", query.trim());
    let _ = writeln!(
        user,
        "Write a detailed research report on this query. Requirements:"
    );
    let _ = writeln!(
        user,
        "- At least {} sections, each with substantive, specific content.",
        options.sections
    );
    let _ = writeln!(
        user,
        "- At least {} characters of section content in total.",
        options.min_chars
    );
    let _ = writeln!(
        user,
        "- At least {} references, numbered from 1 and cited inline as [n].",
        options.references
    );
    let _ = writeln!(
        user,
        "- Every URL must be real and verifiable. Prefer DOIs, arXiv, publisher and government pages."
    );
    let _ = writeln!(
        user,
        "- Suggest relevant PDFs, images and datasets where they exist; use empty arrays otherwise."
    );
    if options.grounding {
        let _ = writeln!(
            user,
            "- Use Google Search to find current sources and take URLs from the search results."
        );
    }
    let _ = write!(
        user,
        "\nRespond with exactly this JSON shape inside a ```json block:\n{}\n",
        JSON_SHAPE
    );

    ReportPrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    }
}

/// The retry prompt: the base prompt with amplified targets and a directive naming
/// what the previous attempt lacked.
pub fn amplified_report_prompt(
    query: &str,
    options: &ReportPromptOptions,
    shortfalls: &[Shortfall],
) -> ReportPrompt {
    let mut prompt = report_prompt(query, options);
    let mut directive = String::from(
        "IMPORTANT: A previous answer to this query was too thin and was rejected. It fell short on:\n",
    );
    for shortfall in shortfalls {
        let _ = writeln!(directive, "- {}", shortfall);
    }
    let _ = writeln!(
        directive,
        "This time you MUST write at least {} sections and at least {} references, with every \
         section several paragraphs long. Do not summarize or abbreviate.\n",
        options.sections, options.references
    );
    prompt.user = directive + &prompt.user;
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::quality::Metric;

    fn options() -> ReportPromptOptions {
        ReportPromptOptions {
            sections: 5,
            references: 8,
            min_chars: 5000,
            grounding: false,
        }
    }

    #[test]
    fn test_report_prompt_states_targets() {
        let prompt = report_prompt("  sodium-ion batteries ", &options());
        assert!(prompt.user.starts_with("Research query: sodium-ion batteries\n"));
        assert!(prompt.user.contains("At least 5 sections"));
        assert!(prompt.user.contains("At least 8 references"));
        assert!(prompt.user.contains("\"suggestedDatasets\""));
        assert!(!prompt.user.contains("Google Search"));
        assert!(prompt.system.contains("```json"));
    }

    #[test]
    fn test_report_prompt_grounding_hint() {
        let prompt = report_prompt("q", &ReportPromptOptions {
            grounding: true,
            ..options()
        });
        assert!(prompt.user.contains("Google Search"));
    }

    #[test]
    fn test_amplified_prompt_lists_shortfalls_first() {
        let amplified = ReportPromptOptions {
            sections: 8,
            references: 12,
            ..options()
        };
        let shortfalls = [Shortfall {
            metric: Metric::References,
            observed: 3,
            required: 8,
        }];
        let prompt = amplified_report_prompt("q", &amplified, &shortfalls);
        assert!(prompt.user.starts_with("IMPORTANT:"));
        assert!(prompt.user.contains("- references: 3 (need at least 8)"));
        assert!(prompt.user.contains("at least 8 sections and at least 12 references"));
        assert!(prompt.user.contains("Research query: q"));
    }
}
