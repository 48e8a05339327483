//! Research report pipeline: model, parsing, quality scoring, generation, storage.

pub mod generator;
pub mod parse;
pub mod prompts;
pub mod quality;
pub mod store;
pub mod types;

pub use generator::{GenerateOptions, GeneratedReport, ReportGenerator};
pub use parse::{extract_json_array, parse_report};
pub use quality::{QualityAssessment, QualityMetrics, QualityThresholds, Shortfall, compare};
pub use store::{ReportStore, ReportSummary};
pub use types::{Reference, Report, Section, SuggestedResource};
