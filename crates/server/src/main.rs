use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use server_api::{
    generate_insights, generate_weekly_report, get_kpis, list_weekly_reports, ApiContext,
    GeminiInsightGenerator,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{HealthResponse, InsightsResponse, KpiResponse, WeeklyReport},
};
use storage::Storage;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgQuery {
    org_id: Option<String>,
    timeframe: Option<String>,
}

/// Request body shared by the POST endpoints. A missing or unreadable body
/// is treated as empty so the handler reports the missing `orgId`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgBody {
    org_id: Option<String>,
    timeframe: Option<String>,
}

impl OrgBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let storage = Storage::new(&settings.database_url)
        .await
        .map_err(|error| {
            error!(
                database_url = %settings.database_url,
                error = %format!("{error:#}"),
                "failed to open SQLite database; verify the path and its permissions"
            );
            error
        })?;

    let mut api = ApiContext::new(storage);
    match settings.gemini_api_key.as_deref() {
        Some(api_key) => {
            let generator = GeminiInsightGenerator::new(api_key, settings.gemini_model.as_str())?;
            info!(model = generator.model(), "model-written insights enabled");
            api = api.with_insight_generator(Arc::new(generator));
        }
        None => info!("GEMINI_API_KEY not set; insights use the rule-based generator"),
    }

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "MarketPulse backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/healthz", get(healthz))
        .route("/api/kpis", get(http_get_kpis))
        .route("/api/insights", post(http_generate_insights))
        .route("/api/generate-weekly-report", post(http_generate_weekly_report))
        .route("/api/reports", get(http_list_reports))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "MarketPulse AI backend is running".to_string(),
    })
}

async fn healthz(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    match state.api.storage.health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(error) => {
            error!(error = %format!("{error:#}"), "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "storage unavailable")
        }
    }
}

async fn http_get_kpis(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OrgQuery>,
) -> ApiResult<KpiResponse> {
    get_kpis(&state.api, q.org_id.as_deref(), q.timeframe.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_generate_insights(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<InsightsResponse> {
    let req = OrgBody::parse(&body);
    generate_insights(&state.api, req.org_id.as_deref(), req.timeframe.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_generate_weekly_report(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<WeeklyReport> {
    let req = OrgBody::parse(&body);
    generate_weekly_report(&state.api, req.org_id.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

async fn http_list_reports(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OrgQuery>,
) -> ApiResult<Vec<WeeklyReport>> {
    list_weekly_reports(&state.api, q.org_id.as_deref())
        .await
        .map(Json)
        .map_err(http_error)
}

fn http_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => {
            error!(message = %err.message, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
