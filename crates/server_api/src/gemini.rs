//! Insights written by a Gemini model through the `generateContent` REST API.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    domain::NEUTRAL_RISK_SCORE,
    protocol::{InsightsData, KpiMetric},
};
use tracing::debug;

use crate::insights::InsightGenerator;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_INSTRUCTIONS: &str = "You are a senior competitive strategy analyst for a SaaS \
company. You receive KPI metrics about competitor performance and must generate clear business \
insights for a product/marketing manager. Always respond with VALID JSON only.";

pub struct GeminiInsightGenerator {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiInsightGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build gemini http client")?;
        Ok(Self::with_client(http, DEFAULT_GEMINI_ENDPOINT, api_key, model))
    }

    pub fn with_client(
        http: Client,
        endpoint: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl InsightGenerator for GeminiInsightGenerator {
    async fn generate(&self, kpis: &[KpiMetric]) -> Result<InsightsData> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": SYSTEM_INSTRUCTIONS },
                    { "text": user_prompt(kpis)? },
                ],
            }],
        });

        debug!(model = %self.model, kpis = kpis.len(), "requesting gemini insights");
        let response: GenerateContentResponse = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("gemini request failed")?
            .error_for_status()
            .context("gemini returned an error status")?
            .json()
            .await
            .context("failed to decode gemini response")?;

        let text = response
            .text()
            .ok_or_else(|| anyhow!("gemini response carried no candidate text"))?;
        parse_model_insights(&text)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect(),
        )
    }
}

fn user_prompt(kpis: &[KpiMetric]) -> Result<String> {
    let kpis_json = serde_json::to_string_pretty(kpis).context("failed to encode kpis")?;
    Ok(format!(
        r#"
Here are the weekly competitor KPIs in JSON:

{kpis_json}

Analyze these KPIs and respond ONLY in valid JSON with this exact structure:

{{
  "summary": "2-4 sentences describing key strengths and weaknesses.",
  "recommendations": [
    "Actionable recommendation 1",
    "Actionable recommendation 2",
    "Actionable recommendation 3"
  ],
  "risk_score": 0
}}

Rules:
- Do NOT include any extra commentary outside the JSON.
- "summary": short, executive-level explanation.
- "recommendations": 2-4 concrete, practical actions.
- "risk_score": integer 0 (no risk) to 100 (very high risk).
"#
    ))
}

/// Reads insights out of free-form model output.
///
/// The summary is trimmed. A lone recommendation becomes a one-item list and
/// blank recommendations are dropped. The risk score defaults to 50 when it
/// is missing or not an integer, and is clamped to `0..=100`.
pub fn parse_model_insights(text: &str) -> Result<InsightsData> {
    let data: Value = serde_json::from_str(extract_json_object(text))
        .context("model output is not valid json")?;
    let Value::Object(fields) = data else {
        bail!("model output is not a json object");
    };

    Ok(InsightsData {
        summary: fields
            .get("summary")
            .map(value_text)
            .unwrap_or_default()
            .trim()
            .to_string(),
        recommendations: coerce_recommendations(fields.get("recommendations")),
        risk_score: coerce_risk_score(fields.get("risk_score")),
    })
}

/// The span from the first `{` to the last `}`, or the trimmed text when
/// there is no such span.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

fn coerce_recommendations(value: Option<&Value>) -> Vec<String> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    };

    items
        .into_iter()
        .map(|item| value_text(item).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn coerce_risk_score(value: Option<&Value>) -> i32 {
    let score = match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(text)) => text.trim().parse::<i64>().ok(),
        Some(Value::Bool(flag)) => Some(i64::from(*flag)),
        _ => None,
    };

    score
        .unwrap_or(i64::from(NEUTRAL_RISK_SCORE))
        .clamp(0, 100) as i32
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/gemini_tests.rs"]
mod tests;
