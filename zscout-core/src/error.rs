//! Error types for the Z-Scout core library.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering the LLM provider, report parsing, configuration, and request validation.

/// Top-level error type for the Z-Scout core library.
#[derive(Debug, thiserror::Error)]
pub enum ZScoutError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ZScoutError {
    /// Shorthand for an [`ZScoutError::InvalidInput`] error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

impl LlmError {
    /// Whether the error is transient and the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::Connection { .. } | LlmError::Timeout { .. }
        )
    }
}

/// Errors from turning model output into a structured report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("No JSON object found in model output (starts with: {preview:?})")]
    NoJsonFound { preview: String },

    #[error("Model output is not a valid report: {message} (starts with: {preview:?})")]
    InvalidJson { message: String, preview: String },

    #[error("Parsed report has no title and no sections")]
    EmptyReport,

    #[error("No subtopics could be extracted from model output")]
    NoSubtopics,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::ParseError {
            message: e.to_string(),
        }
    }
}

/// A type alias for results using the top-level `ZScoutError`.
pub type Result<T> = std::result::Result<T, ZScoutError>;
