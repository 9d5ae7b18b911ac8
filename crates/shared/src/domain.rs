use serde::{Deserialize, Serialize};

/// Reporting window used by every request the app issues.
pub const WEEKLY_TIMEFRAME: &str = "weekly";

/// Organization the dashboard reports on.
pub const DEMO_ORG_ID: &str = "demo-org";

/// Score shown in the header badge when no insights are available.
pub const NEUTRAL_RISK_SCORE: i32 = 50;

pub const LOW_RISK_THRESHOLD: i32 = 35;
pub const HIGH_RISK_THRESHOLD: i32 = 70;

/// Display classification of an insight risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_score(score: i32) -> Self {
        if score < LOW_RISK_THRESHOLD {
            Self::Low
        } else if score < HIGH_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low risk",
            Self::Medium => "medium risk",
            Self::High => "high risk",
        }
    }
}

/// Direction of a KPI's period-over-period change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Flat,
    Down,
}

impl Trend {
    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            Self::Up
        } else if change == 0.0 {
            Self::Flat
        } else {
            Self::Down
        }
    }
}
