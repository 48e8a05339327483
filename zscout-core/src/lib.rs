//! # Z-Scout Core
//!
//! Research backend for the Z-Scout dashboard.
//! Provides the Gemini provider, the report pipeline (parsing, quality scoring,
//! amplified retry, storage), the research handlers, configuration, and the
//! HTTP gateway.

pub mod brain;
pub mod config;
pub mod error;
pub mod gateway;
pub mod persistence;
pub mod providers;
pub mod report;
pub mod research;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{ZScoutConfig, load_config};
pub use error::{ConfigError, LlmError, ReportError, Result, ZScoutError};
pub use gateway::{AppState, ServerConfig, gateway_router, run_gateway};
pub use providers::{GeminiProvider, create_provider};
pub use report::{
    GenerateOptions, GeneratedReport, QualityMetrics, Report, ReportGenerator, ReportStore,
    ReportSummary,
};
pub use research::{ChatReply, ResearchEngine, SubtopicResult};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage, WebSource};
