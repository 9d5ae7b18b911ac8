use super::*;
use axum::{
    body::{self, Body},
    http::Request,
    response::Response,
};
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let app = build_router(Arc::new(AppState {
        api: ApiContext::new(storage.clone()),
    }));
    (app, storage)
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn root_reports_backend_is_running() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "status": "ok", "message": "MarketPulse AI backend is running" })
    );
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn kpis_route_decodes_into_client_response() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(
            Request::get("/api/kpis?orgId=demo-org&timeframe=weekly")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: KpiResponse = serde_json::from_value(json_body(response).await).expect("dto");
    assert_eq!(dto.org_id, "demo-org");
    assert_eq!(dto.timeframe, "weekly");
    assert_eq!(dto.metrics[0].name, "Market Share");
}

#[tokio::test]
async fn kpis_route_requires_org_id() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(Request::get("/api/kpis").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Missing orgId query param" })
    );
}

#[tokio::test]
async fn insights_route_returns_kpis_and_rule_based_insights() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(post_json(
            "/api/insights",
            serde_json::json!({ "orgId": "demo-org", "timeframe": "weekly" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let dto: InsightsResponse = serde_json::from_value(json_body(response).await).expect("dto");
    assert_eq!(dto.kpis.len(), 3);
    assert_eq!(dto.insights.risk_score, 50);
    assert!(dto.insights.summary.starts_with("Strengths:"));
}

#[tokio::test]
async fn insights_route_treats_missing_body_as_missing_org() {
    let (app, _storage) = test_app().await;
    let response = app
        .oneshot(
            Request::post("/api/insights")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({ "error": "Missing orgId in request body" })
    );
}

#[tokio::test]
async fn weekly_report_route_stores_report_for_listing() {
    let (app, storage) = test_app().await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/generate-weekly-report",
            serde_json::json!({ "orgId": "demo-org" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let report: WeeklyReport = serde_json::from_value(json_body(response).await).expect("dto");
    assert_eq!(report.title, "Weekly MarketPulse Report for org demo-org");

    let stored = storage
        .list_weekly_reports("demo-org", 10)
        .await
        .expect("stored");
    assert_eq!(stored.len(), 1);

    let response = app
        .oneshot(
            Request::get("/api/reports?orgId=demo-org")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Vec<WeeklyReport> =
        serde_json::from_value(json_body(response).await).expect("dto");
    assert_eq!(listed[0].report_id, report.report_id);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, _storage) = test_app().await;
    let payload = serde_json::json!({
        "orgId": "demo-org",
        "padding": "x".repeat(MAX_REQUEST_BODY_BYTES + 1),
    })
    .to_string();
    let request = Request::post("/api/insights")
        .header("content-type", "application/json")
        .header("content-length", payload.len())
        .body(Body::from(payload))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
