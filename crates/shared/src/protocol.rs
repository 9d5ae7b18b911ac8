use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::WEEKLY_TIMEFRAME;

fn default_timeframe() -> String {
    WEEKLY_TIMEFRAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMetric {
    pub name: String,
    pub value: f64,
    pub change: f64,
}

impl KpiMetric {
    pub fn new(name: impl Into<String>, value: f64, change: f64) -> Self {
        Self {
            name: name.into(),
            value,
            change,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResponse {
    pub org_id: String,
    pub timeframe: String,
    pub metrics: Vec<KpiMetric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    pub org_id: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl InsightsRequest {
    pub fn weekly(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            timeframe: default_timeframe(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsData {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub risk_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    pub org_id: String,
    pub timeframe: String,
    pub kpis: Vec<KpiMetric>,
    pub insights: InsightsData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub report_id: Uuid,
    pub org_id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub kpis: Vec<KpiMetric>,
    pub insights: InsightsData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_kpi_payload_with_integer_values() {
        let raw = r#"{
            "orgId": "demo-org",
            "timeframe": "weekly",
            "metrics": [
                {"name": "Market Share", "value": 25.0, "change": 2.5},
                {"name": "Campaigns Active", "value": 4, "change": 1.0}
            ]
        }"#;
        let response: KpiResponse = serde_json::from_str(raw).expect("kpis");
        assert_eq!(response.org_id, "demo-org");
        assert_eq!(response.metrics[1], KpiMetric::new("Campaigns Active", 4.0, 1.0));
    }

    #[test]
    fn insights_request_uses_camel_case_and_weekly_default() {
        let body = serde_json::to_value(InsightsRequest::weekly("demo-org")).expect("json");
        assert_eq!(
            body,
            serde_json::json!({ "orgId": "demo-org", "timeframe": "weekly" })
        );

        let parsed: InsightsRequest =
            serde_json::from_str(r#"{"orgId":"acme"}"#).expect("request");
        assert_eq!(parsed.timeframe, "weekly");
    }

    #[test]
    fn insights_data_keeps_snake_case_risk_score() {
        let raw = r#"{"summary":"Growing steadily","recommendations":["Invest in marketing"],"risk_score":30}"#;
        let data: InsightsData = serde_json::from_str(raw).expect("insights");
        assert_eq!(data.risk_score, 30);
        assert_eq!(data.recommendations, vec!["Invest in marketing".to_string()]);
    }
}
