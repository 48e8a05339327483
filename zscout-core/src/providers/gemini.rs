//! Google Gemini API provider implementation.
//!
//! Implements the `LlmProvider` trait for the native Google Gemini API.
//!
//! Key differences from OpenAI-compatible APIs:
//! - Auth via `?key=API_KEY` query parameter (not header-based)
//! - System instruction is a top-level `system_instruction` field
//! - Roles are `"user"` / `"model"` (not `"assistant"`)
//! - Search grounding is a `google_search` tool; grounded answers carry `groundingMetadata`
//! - JSON mode (`responseMimeType`) cannot be combined with the search tool

use crate::brain::LlmProvider;
use crate::config::GeminiConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, GroundingMetadata, Message, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// The default Google Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    default_max_output_tokens: u32,
    timeout_secs: u64,
}

impl GeminiProvider {
    /// Create a new Gemini provider from configuration.
    ///
    /// Reads the API key from `config.api_key` or the environment variable named by
    /// `config.api_key_env`. Returns `LlmError::AuthFailed` if neither is set.
    pub fn new(config: &GeminiConfig) -> Result<Self, LlmError> {
        let api_key = super::resolve_api_key(config)?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new Gemini provider with an explicitly provided API key.
    pub fn new_with_key(config: &GeminiConfig, api_key: String) -> Result<Self, LlmError> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            default_max_output_tokens: config.max_output_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build the JSON request body for the Gemini API.
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let max_tokens = request
            .max_output_tokens
            .unwrap_or(self.default_max_output_tokens);

        let contents = Self::messages_to_contents(&request.messages);

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": request.temperature,
            },
        });

        if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
            body["system_instruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }

        if request.grounding {
            body["tools"] = serde_json::json!([{"google_search": {}}]);
        } else if request.json_response {
            body["generationConfig"]["responseMimeType"] =
                Value::String("application/json".to_string());
        }

        body
    }

    /// Convert messages to Gemini `contents`, fixing sequencing requirements:
    /// consecutive same-role turns are merged, empty turns dropped, and the first
    /// turn is always `"user"`.
    fn messages_to_contents(messages: &[Message]) -> Vec<Value> {
        let mut merged: Vec<(String, Vec<Value>)> = Vec::with_capacity(messages.len());
        for msg in messages {
            if msg.content.trim().is_empty() {
                continue;
            }
            let role = msg.role.to_string();
            let part = serde_json::json!({"text": msg.content});
            match merged.last_mut() {
                Some((last_role, parts)) if *last_role == role => parts.push(part),
                _ => merged.push((role, vec![part])),
            }
        }

        if merged.first().is_some_and(|(role, _)| role != "user") {
            merged.insert(
                0,
                ("user".to_string(), vec![serde_json::json!({"text": "Hello"})]),
            );
        }

        merged
            .into_iter()
            .map(|(role, parts)| serde_json::json!({"role": role, "parts": parts}))
            .collect()
    }

    /// Parse a Gemini API response JSON into a `CompletionResponse`.
    fn parse_response(body: &Value) -> Result<CompletionResponse, LlmError> {
        let candidates = body["candidates"]
            .as_array()
            .ok_or_else(|| LlmError::ResponseParse {
                message: match body["promptFeedback"]["blockReason"].as_str() {
                    Some(reason) => format!("Prompt blocked by Gemini: {}", reason),
                    None => "Missing 'candidates' array in response".to_string(),
                },
            })?;

        let candidate = candidates.first().ok_or_else(|| LlmError::ResponseParse {
            message: "Empty 'candidates' array in response".to_string(),
        })?;

        let finish_reason = candidate["finishReason"].as_str().map(|s| s.to_string());

        let text = match candidate["content"]["parts"].as_array() {
            Some(parts) => parts
                .iter()
                .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            None if finish_reason.is_some() => String::new(),
            None => {
                return Err(LlmError::ResponseParse {
                    message: "Missing 'parts' array in candidate content".to_string(),
                });
            }
        };

        if text.is_empty() && finish_reason.as_deref() == Some("SAFETY") {
            return Err(LlmError::ResponseParse {
                message: "Response blocked by Gemini safety filters".to_string(),
            });
        }

        let grounding = candidate
            .get("groundingMetadata")
            .and_then(|g| serde_json::from_value::<GroundingMetadata>(g.clone()).ok());

        let usage_metadata = &body["usageMetadata"];
        let usage = TokenUsage {
            input_tokens: usage_metadata["promptTokenCount"].as_u64().unwrap_or(0) as usize,
            output_tokens: usage_metadata["candidatesTokenCount"].as_u64().unwrap_or(0) as usize,
        };

        let model = body["modelVersion"]
            .as_str()
            .unwrap_or("gemini")
            .to_string();

        Ok(CompletionResponse {
            text,
            usage,
            model,
            finish_reason,
            grounding,
        })
    }

    /// Map an HTTP status code to the appropriate `LlmError`.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str) -> LlmError {
        let detail = serde_json::from_str::<Value>(body_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(|s| s.to_string()))
            .unwrap_or_else(|| body_text.chars().take(300).collect());
        match status.as_u16() {
            401 | 403 => LlmError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            429 => LlmError::RateLimited {
                retry_after_secs: 30,
            },
            500 | 502 | 503 => LlmError::Connection {
                message: format!("HTTP {} from Gemini API: {}", status, detail),
            },
            _ => LlmError::ApiRequest {
                message: format!("HTTP {} from Gemini API: {}", status, detail),
            },
        }
    }

    /// Map a transport error from reqwest.
    fn map_transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else if e.is_connect() {
            LlmError::Connection {
                message: format!("Could not reach Gemini API: {}", e),
            }
        } else {
            LlmError::ApiRequest {
                message: format!("Request to Gemini API failed: {}", e),
            }
        }
    }

    /// Build the endpoint URL for a Gemini API call.
    fn endpoint_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.base_url, model, method, self.api_key
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let body = self.build_request_body(&request);
        let url = self.endpoint_url(model, "generateContent");

        debug!(
            model,
            grounding = request.grounding,
            max_output_tokens = ?request.max_output_tokens,
            "Sending Gemini completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini API returned an error status");
            return Err(Self::map_http_error(status, &body_text));
        }

        let response_json: Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ResponseParse {
                message: format!("Invalid JSON in response: {}", e),
            })?;

        Self::parse_response(&response_json)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn supports_grounding(&self) -> bool {
        true
    }
}
