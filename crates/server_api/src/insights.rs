//! Insight generation from a set of KPIs.
//!
//! [`rule_based_insights`] is always available. Other generators plug in
//! through [`InsightGenerator`] and fall back to the rules when they fail.

use async_trait::async_trait;
use shared::protocol::{InsightsData, KpiMetric};
use tracing::warn;

const BASE_RISK: i64 = 50;
const RISK_RELIEF_PER_IMPROVEMENT: i64 = 5;
const RISK_PER_DECLINE: i64 = 10;

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate(&self, kpis: &[KpiMetric]) -> anyhow::Result<InsightsData>;
}

pub struct RuleBasedInsights;

#[async_trait]
impl InsightGenerator for RuleBasedInsights {
    async fn generate(&self, kpis: &[KpiMetric]) -> anyhow::Result<InsightsData> {
        Ok(rule_based_insights(kpis))
    }
}

/// Runs `generator`, answering with the rule-based analysis when there are no
/// KPIs or the generator fails.
pub async fn insights_with_fallback(
    generator: &dyn InsightGenerator,
    kpis: &[KpiMetric],
) -> InsightsData {
    if kpis.is_empty() {
        return rule_based_insights(kpis);
    }

    match generator.generate(kpis).await {
        Ok(insights) => insights,
        Err(err) => {
            warn!(
                error = %format!("{err:#}"),
                "insight generator failed; using rule-based insights"
            );
            rule_based_insights(kpis)
        }
    }
}

pub fn rule_based_insights(kpis: &[KpiMetric]) -> InsightsData {
    if kpis.is_empty() {
        return InsightsData {
            summary: "No KPI data available for the selected period.".to_string(),
            recommendations: vec![
                "Please ensure data collection is configured correctly.".to_string(),
                "Verify that competitor signals are being tracked.".to_string(),
            ],
            risk_score: 0,
        };
    }

    let mut improved = Vec::new();
    let mut declined = Vec::new();
    for kpi in kpis {
        let value = format_value(kpi.value);
        if kpi.change > 0.0 {
            improved.push(format!(
                "{} improved by {:.2} points (current: {value}).",
                kpi.name, kpi.change
            ));
        } else if kpi.change < 0.0 {
            declined.push(format!(
                "{} declined by {:.2} points (current: {value}).",
                kpi.name,
                kpi.change.abs()
            ));
        }
    }

    let mut summary_parts = Vec::new();
    if !improved.is_empty() {
        summary_parts.push(format!("Strengths: {}", improved.join(" ")));
    }
    if !declined.is_empty() {
        summary_parts.push(format!("Weaknesses: {}", declined.join(" ")));
    }
    if summary_parts.is_empty() {
        summary_parts.push("KPI performance is stable with no significant changes.".to_string());
    }

    let mut recommendations = Vec::new();
    if !declined.is_empty() {
        recommendations.push(
            "Focus on improving the KPIs that declined. Consider targeted campaigns \
             and pricing adjustments where performance dropped."
                .to_string(),
        );
    }
    if !improved.is_empty() {
        recommendations.push(
            "Double down on areas where KPIs improved. Allocate more budget and resources \
             to reinforce these strengths."
                .to_string(),
        );
    }

    InsightsData {
        summary: summary_parts.join(" "),
        recommendations,
        risk_score: risk_score(improved.len(), declined.len()),
    }
}

fn risk_score(improved: usize, declined: usize) -> i32 {
    let raw = BASE_RISK - RISK_RELIEF_PER_IMPROVEMENT * improved as i64
        + RISK_PER_DECLINE * declined as i64;
    raw.clamp(0, 100) as i32
}

/// KPI values are floats end to end, so whole numbers keep one decimal place
/// (`4.0`, `25.0`) and others print as-is (`-3.2`).
fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_kpis() -> Vec<KpiMetric> {
        vec![
            KpiMetric::new("Market Share", 25.0, 2.5),
            KpiMetric::new("Avg Price vs Competitor", -3.2, -1.1),
            KpiMetric::new("Campaigns Active", 4.0, 1.0),
        ]
    }

    #[test]
    fn empty_kpis_produce_zero_risk_placeholder() {
        let insights = rule_based_insights(&[]);
        assert_eq!(insights.risk_score, 0);
        assert_eq!(
            insights.summary,
            "No KPI data available for the selected period."
        );
        assert_eq!(insights.recommendations.len(), 2);
    }

    #[test]
    fn sample_kpis_split_into_strengths_and_weaknesses() {
        let insights = rule_based_insights(&sample_kpis());
        assert_eq!(
            insights.summary,
            "Strengths: Market Share improved by 2.50 points (current: 25.0). \
             Campaigns Active improved by 1.00 points (current: 4.0). \
             Weaknesses: Avg Price vs Competitor declined by 1.10 points (current: -3.2)."
        );
        assert_eq!(insights.recommendations.len(), 2);
        assert!(insights.recommendations[0].starts_with("Focus on improving"));
        assert!(insights.recommendations[1].starts_with("Double down"));
        // 50 - 2 * 5 + 1 * 10
        assert_eq!(insights.risk_score, 50);
    }

    #[test]
    fn unchanged_kpis_are_reported_as_stable() {
        let insights = rule_based_insights(&[KpiMetric::new("Revenue", 100.0, 0.0)]);
        assert_eq!(
            insights.summary,
            "KPI performance is stable with no significant changes."
        );
        assert!(insights.recommendations.is_empty());
        assert_eq!(insights.risk_score, 50);
    }

    #[test]
    fn whole_values_keep_one_decimal_place() {
        let insights = rule_based_insights(&[KpiMetric::new("Campaigns Active", 4.0, 1.0)]);
        assert!(insights.summary.contains("(current: 4.0)."));
        assert_eq!(format_value(-3.2), "-3.2");
        assert_eq!(format_value(0.5), "0.5");
    }

    struct FailingGenerator;

    #[async_trait]
    impl InsightGenerator for FailingGenerator {
        async fn generate(&self, _kpis: &[KpiMetric]) -> anyhow::Result<InsightsData> {
            Err(anyhow::anyhow!("model unavailable"))
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl InsightGenerator for FixedGenerator {
        async fn generate(&self, _kpis: &[KpiMetric]) -> anyhow::Result<InsightsData> {
            Ok(InsightsData {
                summary: "Model summary".to_string(),
                recommendations: vec!["Model action".to_string()],
                risk_score: 12,
            })
        }
    }

    #[tokio::test]
    async fn failing_generator_falls_back_to_rules() {
        let kpis = sample_kpis();
        let insights = insights_with_fallback(&FailingGenerator, &kpis).await;
        assert_eq!(insights, rule_based_insights(&kpis));
    }

    #[tokio::test]
    async fn generator_output_is_used_when_it_succeeds() {
        let insights = insights_with_fallback(&FixedGenerator, &sample_kpis()).await;
        assert_eq!(insights.summary, "Model summary");
        assert_eq!(insights.risk_score, 12);
    }

    #[tokio::test]
    async fn empty_kpis_never_reach_the_generator() {
        let insights = insights_with_fallback(&FixedGenerator, &[]).await;
        assert_eq!(insights, rule_based_insights(&[]));
    }

    #[test]
    fn risk_score_is_clamped() {
        assert_eq!(risk_score(20, 0), 0);
        assert_eq!(risk_score(0, 6), 100);
        assert_eq!(risk_score(1, 2), 65);
    }
}
