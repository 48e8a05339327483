//! Integration tests for the gateway REST endpoints.
//!
//! Drives the router end to end with a scripted provider and a temporary report store.

use axum::body::Body;
use std::sync::Arc;
use tower::ServiceExt;
use zscout_core::{
    AppState, MockLlmProvider, ReportStore, ResearchEngine, ServerConfig, ZScoutConfig,
    gateway_router,
};

const TOKEN: &str = "dashboard-token";

fn report_reply(sections: usize, references: usize) -> String {
    let sections: Vec<_> = (0..sections)
        .map(|i| serde_json::json!({"heading": format!("Part {}", i), "content": "c".repeat(1200)}))
        .collect();
    let references: Vec<_> = (0..references)
        .map(|i| serde_json::json!({"title": format!("Source {}", i), "link": format!("https://s.example/{}", i), "year": 2024}))
        .collect();
    format!(
        "```json\n{}\n```",
        serde_json::json!({"title": "Green Hydrogen", "sections": sections, "references": references})
    )
}

fn make_state(mock: Arc<MockLlmProvider>, store_dir: &std::path::Path) -> AppState {
    let engine = ResearchEngine::new(mock, ZScoutConfig::default())
        .with_store(ReportStore::new(store_dir));
    let config = ServerConfig {
        auth_tokens: vec![TOKEN.into()],
        ..ServerConfig::default()
    };
    AppState::new(Arc::new(engine), config)
}

fn authed(builder: axum::http::request::Builder) -> axum::http::request::Builder {
    builder.header("apikey", TOKEN)
}

fn make_post_request(uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    authed(axum::http::Request::builder())
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn make_get_request(uri: &str) -> axum::http::Request<Body> {
    authed(axum::http::Request::builder())
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(
    state: &AppState,
    request: axum::http::Request<Body>,
) -> (axum::http::StatusCode, serde_json::Value) {
    let app = gateway_router(state.clone());
    let resp = ServiceExt::<axum::http::Request<Body>>::oneshot(app, request)
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_generate_then_list_and_fetch_report() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockLlmProvider::with_texts([report_reply(5, 8)]));
    let state = make_state(mock, dir.path());

    let (status, report) = send(
        &state,
        make_post_request(
            "/functions/v1/generate-report-gemini",
            serde_json::json!({"query": "green hydrogen costs", "useGrounding": true}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(report["title"], "Green Hydrogen");
    assert_eq!(report["sections"][0]["title"], "Part 0");
    assert_eq!(report["references"][0]["url"], "https://s.example/0");
    assert_eq!(report["references"][0]["year"], "2024");
    assert_eq!(report["attempts"], 1);
    assert_eq!(report["retried"], false);
    assert_eq!(report["quality"]["sectionCount"], 5);
    let id = report["id"].as_str().unwrap().to_string();

    let (status, list) = send(&state, make_get_request("/api/reports")).await;
    assert_eq!(status, 200);
    assert_eq!(list["total"], 1);
    assert_eq!(list["reports"][0]["id"], id.as_str());
    assert_eq!(list["reports"][0]["referenceCount"], 8);

    let (status, stored) = send(&state, make_get_request(&format!("/api/reports/{}", id))).await;
    assert_eq!(status, 200);
    assert_eq!(stored["query"], "green hydrogen costs");

    let (status, missing) = send(&state, make_get_request("/api/reports/not-a-uuid")).await;
    assert_eq!(status, 404);
    assert!(missing["error"].as_str().unwrap().contains("not-a-uuid"));
}

#[tokio::test]
async fn test_thin_report_is_retried_through_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockLlmProvider::with_texts([report_reply(2, 1), report_reply(6, 10)]));
    let state = make_state(mock.clone(), dir.path());

    let (status, report) = send(
        &state,
        make_post_request(
            "/functions/v1/generate-report-gemini",
            serde_json::json!({"query": "electrolyzers"}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(report["retried"], true);
    assert_eq!(report["attempts"], 2);
    assert_eq!(report["quality"]["referenceCount"], 10);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_sibling_functions() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockLlmProvider::with_texts([
        "Abstract: Hydrogen is getting cheaper.".to_string(),
        r#"{"summary": "Costs fall with scale.", "keyFindings": ["Scale"], "sources": [{"title": "IEA", "url": "https://iea.example"}]}"#.to_string(),
        "Mostly because of electrolyzer costs.".to_string(),
    ]));
    let state = make_state(mock, dir.path());

    let (status, json) = send(
        &state,
        make_post_request(
            "/functions/v1/generate-abstract",
            serde_json::json!({"title": "Green Hydrogen", "sections": [{"title": "Cost", "content": "Falling."}]}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["abstract"], "Hydrogen is getting cheaper.");

    let (status, json) = send(
        &state,
        make_post_request(
            "/functions/v1/scrape-subtopics",
            serde_json::json!({"query": "green hydrogen", "subtopics": ["Cost"]}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["results"][0]["subtopic"], "Cost");
    assert_eq!(json["results"][0]["keyFindings"][0], "Scale");
    assert_eq!(json["results"][0]["sources"][0]["url"], "https://iea.example");

    let (status, json) = send(
        &state,
        make_post_request(
            "/functions/v1/research-chat",
            serde_json::json!({
                "messages": [{"role": "user", "content": "Why is it cheaper?"}],
                "reportContext": {"title": "Green Hydrogen", "sections": []}
            }),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(json["reply"], "Mostly because of electrolyzer costs.");
    assert_eq!(json["sources"], serde_json::json!([]));
}

#[tokio::test]
async fn test_chat_rejects_trailing_model_message() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(Arc::new(MockLlmProvider::new()), dir.path());
    let (status, json) = send(
        &state,
        make_post_request(
            "/functions/v1/research-chat",
            serde_json::json!({"messages": [{"role": "assistant", "content": "hi"}]}),
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert!(json["error"].as_str().unwrap().contains("user"));
}

#[tokio::test]
async fn test_missing_credentials_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = make_state(Arc::new(MockLlmProvider::new()), dir.path());
    let request = axum::http::Request::builder()
        .uri("/api/reports")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, request).await;
    assert_eq!(status, 401);
}
