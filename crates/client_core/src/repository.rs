use std::sync::Arc;

use shared::{
    domain::WEEKLY_TIMEFRAME,
    protocol::{InsightsRequest, InsightsResponse, KpiResponse},
};

use crate::{api::MarketPulseApi, error::ApiClientError};

/// Fetches dashboard data for an organization over the fixed weekly timeframe.
///
/// Each call is a single attempt against the backend. Nothing is cached.
#[derive(Clone)]
pub struct DashboardRepository {
    api: Arc<dyn MarketPulseApi>,
}

impl DashboardRepository {
    pub fn new(api: Arc<dyn MarketPulseApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_kpis(&self, org_id: &str) -> Result<KpiResponse, ApiClientError> {
        self.api.get_kpis(org_id, WEEKLY_TIMEFRAME).await
    }

    pub async fn fetch_insights(&self, org_id: &str) -> Result<InsightsResponse, ApiClientError> {
        let request = InsightsRequest::weekly(org_id);
        self.api.get_insights(&request).await
    }
}
