//! Text rendering of the dashboard state.

use client_core::{DashboardPhase, DashboardState};
use shared::{
    domain::{RiskBand, Trend, NEUTRAL_RISK_SCORE},
    protocol::{InsightsData, KpiMetric},
};

use crate::commands::HELP_TEXT;

pub const APP_TITLE: &str = "MarketPulse AI";
const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render(state: &DashboardState, org_id: &str) -> String {
    let mut lines = vec![APP_TITLE.to_string(), "=".repeat(APP_TITLE.len()), String::new()];

    match state.phase() {
        DashboardPhase::Loading => lines.push("Loading dashboard...".to_string()),
        DashboardPhase::Failed(message) => {
            lines.push("Oops!".to_string());
            lines.push(message.to_string());
            lines.push(String::new());
            lines.push("Type `r` and press enter to retry.".to_string());
        }
        DashboardPhase::Ready { metrics, insights } => {
            render_content(&mut lines, org_id, metrics, insights);
            lines.push(String::new());
            lines.push(HELP_TEXT.to_string());
        }
    }

    lines.join("\n")
}

fn render_content(
    lines: &mut Vec<String>,
    org_id: &str,
    metrics: &[KpiMetric],
    insights: Option<&InsightsData>,
) {
    let risk_score = insights.map_or(NEUTRAL_RISK_SCORE, |insights| insights.risk_score);
    lines.push("Competitor Pulse".to_string());
    lines.push(org_id.to_string());
    lines.push("Weekly snapshot".to_string());
    lines.push(format!("AI-powered insights | {}", risk_badge(risk_score)));

    if !metrics.is_empty() {
        lines.push(String::new());
        lines.push("Key KPIs".to_string());
        lines.extend(metrics.iter().map(metric_line));

        lines.push(String::new());
        lines.push("Trend Overview".to_string());
        let values: Vec<f64> = metrics.iter().map(|metric| metric.value).collect();
        lines.push(format!("  KPI Value Trend  {}", sparkline(&values)));
    }

    if let Some(insights) = insights {
        lines.push(String::new());
        lines.push(format!("AI Insights | {}", risk_badge(insights.risk_score)));
        lines.push(format!("  {}", insights.summary));
        if !insights.recommendations.is_empty() {
            lines.push("  Recommended actions".to_string());
            lines.extend(
                insights
                    .recommendations
                    .iter()
                    .map(|recommendation| format!("  • {recommendation}")),
            );
        }
    }
}

pub fn risk_badge(risk_score: i32) -> String {
    let band = RiskBand::from_score(risk_score);
    let marker = if band == RiskBand::High { "⚠ " } else { "" };
    format!("{marker}Risk: {risk_score} ({})", band.label())
}

fn metric_line(metric: &KpiMetric) -> String {
    let marker = match Trend::from_change(metric.change) {
        Trend::Up => '▲',
        Trend::Flat => '■',
        Trend::Down => '▼',
    };
    format!(
        "  {:<28} Value: {:.2}  {marker} {}",
        metric.name,
        metric.value,
        format_change(metric.change)
    )
}

/// Positive changes carry an explicit `+`.
pub fn format_change(change: f64) -> String {
    if change > 0.0 {
        format!("+{change:.2}")
    } else {
        format!("{change:.2}")
    }
}

/// One bar per value, scaled between the smallest and largest finite value.
pub fn sparkline(values: &[f64]) -> String {
    let finite = values.iter().copied().filter(|value| value.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
        (min.min(value), max.max(value))
    });
    let top = SPARK_BARS.len() - 1;

    values
        .iter()
        .map(|value| {
            if !value.is_finite() {
                ' '
            } else if max <= min {
                SPARK_BARS[top / 2]
            } else {
                let scaled = ((value - min) / (max - min) * top as f64).round() as usize;
                SPARK_BARS[scaled.min(top)]
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
