//! Report generation with one amplified retry for thin reports.

use super::parse::parse_report;
use super::prompts::{ReportPrompt, ReportPromptOptions, amplified_report_prompt, report_prompt};
use super::quality::{QualityAssessment, QualityMetrics, compare};
use super::types::Report;
use crate::brain::LlmProvider;
use crate::config::{GeminiConfig, QualityConfig, RetryConfig, ZScoutConfig};
use crate::error::{LlmError, Result, ZScoutError};
use crate::providers::with_retry;
use crate::types::{CompletionRequest, CompletionResponse, TokenUsage, WebSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-call options for [`ReportGenerator::generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Use Google Search grounding. `None` falls back to the configured default.
    pub grounding: Option<bool>,
    /// Model override for this call.
    pub model: Option<String>,
    /// Return the first parsed report even when it is below the thresholds.
    pub skip_quality_retry: bool,
}

/// A parsed report together with how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub id: Uuid,
    pub query: String,
    #[serde(flatten)]
    pub report: Report,
    pub quality: QualityMetrics,
    pub attempts: u32,
    pub retried: bool,
    #[serde(default)]
    pub grounding_sources: Vec<WebSource>,
    pub model: String,
    #[serde(default)]
    pub usage: TokenUsage,
    pub created_at: DateTime<Utc>,
}

/// One parsed attempt.
struct Attempt {
    report: Report,
    metrics: QualityMetrics,
    sources: Vec<WebSource>,
    model: String,
}

impl Attempt {
    fn from_response(response: &CompletionResponse) -> std::result::Result<Self, ZScoutError> {
        let report = parse_report(&response.text)?;
        Ok(Self {
            metrics: QualityMetrics::measure(&report),
            report,
            sources: response.sources(),
            model: response.model.clone(),
        })
    }
}

/// Turns a research query into a structured report.
pub struct ReportGenerator {
    provider: Arc<dyn LlmProvider>,
    gemini: GeminiConfig,
    retry: RetryConfig,
    quality: QualityConfig,
}

impl ReportGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ZScoutConfig) -> Self {
        Self {
            provider,
            gemini: config.gemini.clone(),
            retry: config.retry.clone(),
            quality: config.quality.clone(),
        }
    }

    /// Generate a report for `query`.
    ///
    /// Transient provider errors are retried with backoff. A report below the
    /// quality thresholds is requested once more with an amplified prompt and
    /// larger output limit, and the better of the two is returned.
    pub async fn generate(&self, query: &str, options: &GenerateOptions) -> Result<GeneratedReport> {
        let query = self.validate_query(query)?;
        let grounding = options
            .grounding
            .unwrap_or(self.gemini.grounding_by_default)
            && self.provider.supports_grounding();

        let base = ReportPromptOptions {
            sections: self.quality.min_sections,
            references: self.quality.min_references,
            min_chars: self.quality.min_total_chars,
            grounding,
        };
        let request = self.build_request(
            report_prompt(query, &base),
            grounding,
            self.gemini.temperature,
            self.gemini.max_output_tokens,
            options.model.clone(),
        );

        debug!(query, grounding, "Requesting report");
        let response = self.call(request).await?;
        let mut usage = response.usage;
        let first = Attempt::from_response(&response)?;
        let assessment = first.metrics.assess(&self.quality.thresholds());

        if assessment.passes() || !self.quality.retry_enabled || options.skip_quality_retry {
            return Ok(self.finish(query, first, usage, 1));
        }

        info!(
            shortfalls = assessment.shortfalls.len(),
            total_chars = first.metrics.total_chars,
            sections = first.metrics.section_count,
            references = first.metrics.reference_count,
            "Report below quality thresholds, retrying with amplified prompt"
        );
        let retry_request = self.amplified_request(query, &assessment, grounding, options.model.clone());

        let kept = match self.call(retry_request).await {
            Ok(response) => {
                usage.accumulate(&response.usage);
                match Attempt::from_response(&response) {
                    Ok(second) => {
                        if compare(&second.metrics, &first.metrics) == Ordering::Greater {
                            debug!("Amplified attempt ranked higher");
                            second
                        } else {
                            debug!("First attempt ranked higher or equal");
                            first
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Amplified attempt did not parse, keeping first report");
                        first
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Amplified attempt failed, keeping first report");
                first
            }
        };

        Ok(self.finish(query, kept, usage, 2))
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ZScoutError::invalid_input("query must not be empty"));
        }
        let chars = query.chars().count();
        if chars > self.quality.max_query_chars {
            return Err(ZScoutError::invalid_input(format!(
                "query is {} characters, the limit is {}",
                chars, self.quality.max_query_chars
            )));
        }
        Ok(query)
    }

    fn amplified_request(
        &self,
        query: &str,
        assessment: &QualityAssessment,
        grounding: bool,
        model: Option<String>,
    ) -> CompletionRequest {
        let options = ReportPromptOptions {
            sections: self.quality.amplify(self.quality.min_sections),
            references: self.quality.amplify(self.quality.min_references),
            min_chars: self.quality.min_total_chars,
            grounding,
        };
        let max_tokens = ((self.gemini.max_output_tokens as f32 * self.quality.amplification).ceil()
            as u32)
            .max(self.gemini.max_output_tokens);
        self.build_request(
            amplified_report_prompt(query, &options, &assessment.shortfalls),
            grounding,
            (self.gemini.temperature - 0.1).max(0.0),
            max_tokens.min(self.quality.max_output_tokens_cap),
            model,
        )
    }

    fn build_request(
        &self,
        prompt: ReportPrompt,
        grounding: bool,
        temperature: f32,
        max_output_tokens: u32,
        model: Option<String>,
    ) -> CompletionRequest {
        CompletionRequest {
            temperature,
            max_output_tokens: Some(max_output_tokens),
            grounding,
            json_response: !grounding,
            model,
            ..CompletionRequest::prompt(prompt.system, prompt.user)
        }
    }

    async fn call(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, LlmError> {
        with_retry(&self.retry, || self.provider.complete(request.clone())).await
    }

    fn finish(&self, query: &str, attempt: Attempt, usage: TokenUsage, attempts: u32) -> GeneratedReport {
        info!(
            attempts,
            total_chars = attempt.metrics.total_chars,
            sections = attempt.metrics.section_count,
            references = attempt.metrics.reference_count,
            tokens = usage.total(),
            "Report generated"
        );
        GeneratedReport {
            id: Uuid::new_v4(),
            query: query.to_string(),
            report: attempt.report,
            quality: attempt.metrics,
            attempts,
            retried: attempts > 1,
            grounding_sources: attempt.sources,
            model: attempt.model,
            usage,
            created_at: Utc::now(),
        }
    }
}
