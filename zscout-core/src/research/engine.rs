//! Research engine: one facade over report generation and the sibling handlers.

use super::abstract_gen::{abstract_prompt, clean_abstract};
use super::chat::{ChatReply, chat_system_prompt, trim_history, validate_messages};
use super::scrape::{SubtopicResult, parse_scrape, scrape_prompt};
use super::subtopics::{parse_subtopics, subtopics_prompt};
use crate::brain::LlmProvider;
use crate::config::ZScoutConfig;
use crate::error::{LlmError, ReportError, Result, ZScoutError};
use crate::providers::with_retry;
use crate::report::{GenerateOptions, GeneratedReport, Report, ReportGenerator, ReportStore, Section};
use crate::types::{CompletionRequest, CompletionResponse, Message};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The research backend shared by the gateway and the CLI.
pub struct ResearchEngine {
    provider: Arc<dyn LlmProvider>,
    config: ZScoutConfig,
    generator: ReportGenerator,
    store: Option<ReportStore>,
}

impl ResearchEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, config: ZScoutConfig) -> Self {
        let generator = ReportGenerator::new(provider.clone(), &config);
        Self {
            provider,
            config,
            generator,
            store: None,
        }
    }

    /// Save every generated report to `store`.
    pub fn with_store(mut self, store: ReportStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store(&self) -> Option<&ReportStore> {
        self.store.as_ref()
    }

    /// Load a stored report by its ID string.
    ///
    /// A missing store, a malformed ID, and an unknown ID are all `NotFound`.
    pub fn get_report(&self, id: &str) -> Result<GeneratedReport> {
        let not_found = || ZScoutError::NotFound {
            what: format!("report {}", id),
        };
        let store = self.store.as_ref().ok_or_else(not_found)?;
        let uuid = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
        store.load(&uuid)?.ok_or_else(not_found)
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn config(&self) -> &ZScoutConfig {
        &self.config
    }

    /// Generate a report and, when a store is configured, persist it.
    pub async fn generate_report(
        &self,
        query: &str,
        options: &GenerateOptions,
    ) -> Result<GeneratedReport> {
        let generated = self.generator.generate(query, options).await?;
        if let Some(store) = &self.store {
            match store.save(&generated) {
                Ok(path) => debug!(id = %generated.id, path = %path.display(), "Saved report"),
                Err(e) => warn!(id = %generated.id, error = %e, "Failed to save report"),
            }
        }
        Ok(generated)
    }

    /// Extract up to `max` subtopics for `query`, optionally guided by report text.
    pub async fn extract_subtopics(
        &self,
        query: &str,
        report_content: Option<&str>,
        max: Option<usize>,
    ) -> Result<Vec<String>> {
        let query = non_empty(query, "query")?;
        let max = max
            .filter(|m| *m > 0)
            .unwrap_or(self.config.research.max_subtopics);

        let (system, user) = subtopics_prompt(
            query,
            report_content,
            max,
            self.config.research.chat_context_chars,
        );
        let request = CompletionRequest {
            temperature: self.config.research.temperature,
            json_response: true,
            ..CompletionRequest::prompt(system, user)
        };
        let response = self.call(request).await?;

        let subtopics = parse_subtopics(&response.text, max);
        if subtopics.is_empty() {
            return Err(ReportError::NoSubtopics.into());
        }
        debug!(count = subtopics.len(), "Extracted subtopics");
        Ok(subtopics)
    }

    /// Write a short plain-text abstract for a finished report.
    pub async fn generate_abstract(
        &self,
        title: &str,
        sections: &[Section],
        query: Option<&str>,
    ) -> Result<String> {
        if title.trim().is_empty() && sections.is_empty() {
            return Err(ZScoutError::invalid_input(
                "a title or at least one section is required",
            ));
        }
        let research = &self.config.research;
        let (system, user) = abstract_prompt(
            title,
            sections,
            query,
            research.abstract_section_chars,
            research.abstract_words,
        );
        let request = CompletionRequest {
            temperature: research.temperature,
            ..CompletionRequest::prompt(system, user)
        };
        let response = self.call(request).await?;

        let text = clean_abstract(&response.text);
        if text.is_empty() {
            return Err(LlmError::ResponseParse {
                message: "model returned an empty abstract".to_string(),
            }
            .into());
        }
        Ok(text)
    }

    /// Research each subtopic with grounding, a bounded number at a time.
    ///
    /// Results come back in input order. A failing subtopic produces a result
    /// with `error` set.
    pub async fn scrape_subtopics(
        &self,
        query: &str,
        subtopics: &[String],
    ) -> Result<Vec<SubtopicResult>> {
        let query = non_empty(query, "query")?;
        let mut subtopics: Vec<String> = subtopics
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if subtopics.is_empty() {
            return Err(ZScoutError::invalid_input("at least one subtopic is required"));
        }
        let limit = self.config.scrape.max_subtopics;
        if subtopics.len() > limit {
            warn!(requested = subtopics.len(), limit, "Truncating subtopic list");
            subtopics.truncate(limit);
        }

        let grounding = self.provider.supports_grounding();
        let concurrency = self.config.scrape.max_concurrency.max(1);
        let results: Vec<SubtopicResult> = stream::iter(subtopics)
            .map(|subtopic: String| async move {
                let subtopic = subtopic.as_str();
                let (system, user) = scrape_prompt(query, subtopic);
                let request = CompletionRequest {
                    temperature: self.config.research.temperature,
                    max_output_tokens: Some(self.config.scrape.max_output_tokens),
                    grounding,
                    ..CompletionRequest::prompt(system, user)
                };
                match self.call(request).await {
                    Ok(response) => {
                        let sources = response.sources();
                        parse_scrape(subtopic, &response.text, sources)
                    }
                    Err(e) => {
                        warn!(subtopic, error = %e, "Subtopic research failed");
                        SubtopicResult::failed(subtopic, e)
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        info!(
            count = results.len(),
            failed = results.iter().filter(|r| r.error.is_some()).count(),
            "Scraped subtopics"
        );
        Ok(results)
    }

    /// Answer the last user message, with an optional report as context.
    pub async fn chat(
        &self,
        messages: &[Message],
        report_context: Option<&Report>,
        grounding: bool,
    ) -> Result<ChatReply> {
        validate_messages(messages)?;
        let research = &self.config.research;
        let history = trim_history(messages, research.chat_history_limit);
        let request = CompletionRequest {
            system: Some(chat_system_prompt(report_context, research.chat_context_chars)),
            messages: history.to_vec(),
            temperature: research.temperature,
            grounding: grounding && self.provider.supports_grounding(),
            ..Default::default()
        };
        let response = self.call(request).await?;

        let reply = response.text.trim().to_string();
        if reply.is_empty() {
            return Err(LlmError::ResponseParse {
                message: "model returned an empty chat reply".to_string(),
            }
            .into());
        }
        Ok(ChatReply {
            sources: response.sources(),
            reply,
        })
    }

    async fn call(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, LlmError> {
        with_retry(&self.config.retry, || self.provider.complete(request.clone())).await
    }
}

fn non_empty<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ZScoutError::invalid_input(format!("{} must not be empty", field)));
    }
    Ok(trimmed)
}
