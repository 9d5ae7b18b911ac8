use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::WEEKLY_TIMEFRAME,
    error::ApiError,
    protocol::{InsightsResponse, KpiMetric, KpiResponse, WeeklyReport},
};
use storage::Storage;
use tracing::{info, warn};
use uuid::Uuid;

pub mod gemini;
pub mod insights;

pub use gemini::GeminiInsightGenerator;
pub use insights::{
    insights_with_fallback, rule_based_insights, InsightGenerator, RuleBasedInsights,
};

pub const MISSING_ORG_QUERY: &str = "Missing orgId query param";
pub const MISSING_ORG_BODY: &str = "Missing orgId in request body";
pub const REPORT_NOTIFICATION_TITLE: &str = "New Weekly MarketPulse Report";
pub const REPORT_NOTIFICATION_BODY: &str = "Your latest competitor insights report is ready.";
const REPORT_LIST_LIMIT: u32 = 20;

/// Where KPI metrics for an organization come from.
#[async_trait]
pub trait KpiSource: Send + Sync {
    async fn kpis_for_org(&self, org_id: &str, timeframe: &str)
        -> anyhow::Result<Vec<KpiMetric>>;
}

/// Fixed sample metrics, served until a real metrics store is wired in.
pub struct SampleKpiSource;

#[async_trait]
impl KpiSource for SampleKpiSource {
    async fn kpis_for_org(
        &self,
        _org_id: &str,
        _timeframe: &str,
    ) -> anyhow::Result<Vec<KpiMetric>> {
        Ok(vec![
            KpiMetric::new("Market Share", 25.0, 2.5),
            KpiMetric::new("Avg Price vs Competitor", -3.2, -1.1),
            KpiMetric::new("Campaigns Active", 4.0, 1.0),
        ])
    }
}

/// Announces freshly generated reports to an organization's subscribers.
#[async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn notify(&self, topic: &str, title: &str, body: &str) -> anyhow::Result<()>;
}

pub struct LogNotifier;

#[async_trait]
impl ReportNotifier for LogNotifier {
    async fn notify(&self, topic: &str, title: &str, body: &str) -> anyhow::Result<()> {
        info!(topic, title, body, "report notification sent");
        Ok(())
    }
}

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub kpis: Arc<dyn KpiSource>,
    pub insights: Arc<dyn InsightGenerator>,
    pub notifier: Arc<dyn ReportNotifier>,
}

impl ApiContext {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            kpis: Arc::new(SampleKpiSource),
            insights: Arc::new(RuleBasedInsights),
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_insight_generator(mut self, insights: Arc<dyn InsightGenerator>) -> Self {
        self.insights = insights;
        self
    }
}

pub async fn get_kpis(
    ctx: &ApiContext,
    org_id: Option<&str>,
    timeframe: Option<&str>,
) -> Result<KpiResponse, ApiError> {
    let org_id = require_org_id(org_id, MISSING_ORG_QUERY)?;
    let timeframe = timeframe_or_weekly(timeframe);
    let metrics = ctx
        .kpis
        .kpis_for_org(org_id, &timeframe)
        .await
        .map_err(internal)?;

    Ok(KpiResponse {
        org_id: org_id.to_string(),
        timeframe,
        metrics,
    })
}

pub async fn generate_insights(
    ctx: &ApiContext,
    org_id: Option<&str>,
    timeframe: Option<&str>,
) -> Result<InsightsResponse, ApiError> {
    let org_id = require_org_id(org_id, MISSING_ORG_BODY)?;
    let timeframe = timeframe_or_weekly(timeframe);
    let kpis = ctx
        .kpis
        .kpis_for_org(org_id, &timeframe)
        .await
        .map_err(internal)?;
    let insights = insights_with_fallback(ctx.insights.as_ref(), &kpis).await;

    Ok(InsightsResponse {
        org_id: org_id.to_string(),
        timeframe,
        kpis,
        insights,
    })
}

/// Builds this week's report, stores it and notifies topic `org_{org_id}`.
///
/// A failed notification is logged and does not fail the report.
pub async fn generate_weekly_report(
    ctx: &ApiContext,
    org_id: Option<&str>,
) -> Result<WeeklyReport, ApiError> {
    let org_id = require_org_id(org_id, MISSING_ORG_BODY)?;
    let kpis = ctx
        .kpis
        .kpis_for_org(org_id, WEEKLY_TIMEFRAME)
        .await
        .map_err(internal)?;
    let insights = insights_with_fallback(ctx.insights.as_ref(), &kpis).await;

    let report = WeeklyReport {
        report_id: Uuid::new_v4(),
        org_id: org_id.to_string(),
        created_at: Utc::now(),
        title: format!("Weekly MarketPulse Report for org {org_id}"),
        kpis,
        insights,
    };
    ctx.storage
        .insert_weekly_report(&report)
        .await
        .map_err(internal)?;
    info!(org_id, report_id = %report.report_id, "stored weekly report");

    let topic = format!("org_{org_id}");
    if let Err(err) = ctx
        .notifier
        .notify(&topic, REPORT_NOTIFICATION_TITLE, REPORT_NOTIFICATION_BODY)
        .await
    {
        warn!(topic, error = %err, "failed to send report notification");
    }

    Ok(report)
}

pub async fn list_weekly_reports(
    ctx: &ApiContext,
    org_id: Option<&str>,
) -> Result<Vec<WeeklyReport>, ApiError> {
    let org_id = require_org_id(org_id, MISSING_ORG_QUERY)?;
    ctx.storage
        .list_weekly_reports(org_id, REPORT_LIST_LIMIT)
        .await
        .map_err(internal)
}

/// Only an absent or empty `orgId` is rejected; any other value is used verbatim.
fn require_org_id<'a>(org_id: Option<&'a str>, missing: &str) -> Result<&'a str, ApiError> {
    match org_id {
        Some(org_id) if !org_id.is_empty() => Ok(org_id),
        _ => Err(ApiError::validation(missing)),
    }
}

/// An absent timeframe means weekly; a supplied one, even empty, is echoed back.
fn timeframe_or_weekly(timeframe: Option<&str>) -> String {
    timeframe.unwrap_or(WEEKLY_TIMEFRAME).to_string()
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("{err:#}"))
}
