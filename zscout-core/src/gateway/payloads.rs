//! Request and response bodies for the HTTP routes. camelCase on the wire.

use crate::report::{Report, ReportSummary, Section};
use crate::research::SubtopicResult;
use crate::types::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReportRequest {
    pub query: String,
    #[serde(default)]
    pub use_grounding: Option<bool>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub skip_quality_retry: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSubtopicsRequest {
    pub query: String,
    #[serde(default)]
    pub report_content: Option<String>,
    #[serde(default)]
    pub max_subtopics: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicsResponse {
    pub subtopics: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAbstractRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbstractResponse {
    #[serde(rename = "abstract")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeSubtopicsRequest {
    pub query: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub results: Vec<SubtopicResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub report_context: Option<Report>,
    #[serde(default)]
    pub use_grounding: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub uptime_secs: u64,
    pub store_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_camel_case_and_defaults() {
        let req: GenerateReportRequest = serde_json::from_value(serde_json::json!({
            "query": "q",
            "useGrounding": false,
            "skipQualityRetry": true
        }))
        .unwrap();
        assert_eq!(req.use_grounding, Some(false));
        assert!(req.skip_quality_retry);
        assert!(req.model.is_none());

        let req: GenerateReportRequest = serde_json::from_str(r#"{"query": "q"}"#).unwrap();
        assert_eq!(req.use_grounding, None);
        assert!(!req.skip_quality_retry);
    }

    #[test]
    fn test_abstract_response_field_name() {
        let json = serde_json::to_value(AbstractResponse { text: "A.".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"abstract": "A."}));
    }

    #[test]
    fn test_chat_request_accepts_assistant_role() {
        let req: ResearchChatRequest = serde_json::from_value(serde_json::json!({
            "messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "more"}
            ],
            "reportContext": {"title": "T", "sections": []}
        }))
        .unwrap();
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.report_context.unwrap().title, "T");
        assert!(!req.use_grounding);
    }

    #[test]
    fn test_health_response_keys() {
        let json = serde_json::to_value(HealthResponse {
            status: "ok".into(),
            model: "m".into(),
            uptime_secs: 3,
            store_enabled: true,
        })
        .unwrap();
        assert_eq!(json["uptime_secs"], 3);
        assert_eq!(json["store_enabled"], true);
    }
}
