//! HTTP gateway server built on axum.

use super::auth::GatewayAuth;
use super::payloads::{
    AbstractResponse, ExtractSubtopicsRequest, GenerateAbstractRequest, GenerateReportRequest,
    HealthResponse, ReportListResponse, ResearchChatRequest, ScrapeResponse,
    ScrapeSubtopicsRequest, SubtopicsResponse,
};
use super::ServerConfig;
use crate::error::{LlmError, ZScoutError};
use crate::report::{GenerateOptions, GeneratedReport};
use crate::research::{ChatReply, ResearchEngine};
use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<ResearchEngine>,
    auth: GatewayAuth,
    config: ServerConfig,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<ResearchEngine>, config: ServerConfig) -> Self {
        Self {
            engine,
            auth: GatewayAuth::from_config(&config),
            config,
            started_at: Utc::now(),
        }
    }

    pub fn engine(&self) -> &ResearchEngine {
        &self.engine
    }

    /// Uptime in seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_seconds().max(0) as u64
    }
}

/// Errors rendered as `{ "error": message }` with a matching status code.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    Core(ZScoutError),
}

impl From<ZScoutError> for ApiError {
    fn from(e: ZScoutError) -> Self {
        ApiError::Core(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Core(e) => match e {
                ZScoutError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                ZScoutError::NotFound { .. } => StatusCode::NOT_FOUND,
                ZScoutError::Llm(LlmError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
                ZScoutError::Llm(LlmError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
                ZScoutError::Llm(_) | ZScoutError::Report(_) => StatusCode::BAD_GATEWAY,
                ZScoutError::Io(_) | ZScoutError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Unauthorized => "Missing or invalid credentials".to_string(),
            ApiError::BadRequest(msg) => msg,
            ApiError::Core(e) => {
                if status.is_server_error() {
                    tracing::error!(status = status.as_u16(), error = %e, "Request failed");
                }
                e.to_string()
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/functions/v1/generate-report-gemini",
            post(generate_report_handler),
        )
        .route("/functions/v1/extract-subtopics", post(extract_subtopics_handler))
        .route("/functions/v1/generate-abstract", post(generate_abstract_handler))
        .route("/functions/v1/scrape-subtopics", post(scrape_subtopics_handler))
        .route("/functions/v1/research-chat", post(research_chat_handler))
        .route("/api/reports", get(list_reports_handler))
        .route("/api/reports/{id}", get(get_report_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.auth.validate_headers(request.headers()) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        ApiError::Unauthorized.into_response()
    }
}

/// Health check endpoint.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.engine.model_name().to_string(),
        uptime_secs: state.uptime_secs(),
        store_enabled: state.engine.store().is_some(),
    })
}

async fn generate_report_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateReportRequest>, JsonRejection>,
) -> ApiResult<GeneratedReport> {
    let Json(req) = payload?;
    let options = GenerateOptions {
        grounding: req.use_grounding,
        model: req.model,
        skip_quality_retry: req.skip_quality_retry,
    };
    let generated = state.engine.generate_report(&req.query, &options).await?;
    Ok(Json(generated))
}

async fn extract_subtopics_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExtractSubtopicsRequest>, JsonRejection>,
) -> ApiResult<SubtopicsResponse> {
    let Json(req) = payload?;
    let subtopics = state
        .engine
        .extract_subtopics(&req.query, req.report_content.as_deref(), req.max_subtopics)
        .await?;
    Ok(Json(SubtopicsResponse { subtopics }))
}

async fn generate_abstract_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateAbstractRequest>, JsonRejection>,
) -> ApiResult<AbstractResponse> {
    let Json(req) = payload?;
    let text = state
        .engine
        .generate_abstract(&req.title, &req.sections, req.query.as_deref())
        .await?;
    Ok(Json(AbstractResponse { text }))
}

async fn scrape_subtopics_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeSubtopicsRequest>, JsonRejection>,
) -> ApiResult<ScrapeResponse> {
    let Json(req) = payload?;
    let results = state
        .engine
        .scrape_subtopics(&req.query, &req.subtopics)
        .await?;
    Ok(Json(ScrapeResponse { results }))
}

async fn research_chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ResearchChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    let Json(req) = payload?;
    let reply = state
        .engine
        .chat(&req.messages, req.report_context.as_ref(), req.use_grounding)
        .await?;
    Ok(Json(reply))
}

async fn list_reports_handler(State(state): State<AppState>) -> ApiResult<ReportListResponse> {
    let reports = state
        .engine
        .store()
        .map(|store| store.list())
        .unwrap_or_default();
    Ok(Json(ReportListResponse {
        total: reports.len(),
        reports,
    }))
}

async fn get_report_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<GeneratedReport> {
    Ok(Json(state.engine.get_report(&id)?))
}

/// Start the gateway on `config.host:config.port`.
///
/// Runs until the process receives Ctrl-C.
pub async fn run(config: ServerConfig, engine: Arc<ResearchEngine>) -> Result<(), std::io::Error> {
    let addr = config.bind_addr();
    let open_mode = config.auth_tokens.is_empty();
    let app = router(AppState::new(engine, config));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, open_mode, "Z-Scout gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down gateway");
        })
        .await?;
    Ok(())
}
