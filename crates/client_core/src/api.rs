use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{InsightsRequest, InsightsResponse, KpiResponse},
};
use tracing::debug;
use url::Url;

use crate::error::ApiClientError;

const KPIS_PATH: &str = "api/kpis";
const INSIGHTS_PATH: &str = "api/insights";

/// Remote operations offered by the MarketPulse backend.
#[async_trait]
pub trait MarketPulseApi: Send + Sync {
    async fn get_kpis(&self, org_id: &str, timeframe: &str)
        -> Result<KpiResponse, ApiClientError>;
    async fn get_insights(
        &self,
        request: &InsightsRequest,
    ) -> Result<InsightsResponse, ApiClientError>;
}

pub struct HttpMarketPulseApi {
    http: Client,
    base_url: Url,
}

impl HttpMarketPulseApi {
    pub fn new(server_url: &str) -> Result<Self, ApiClientError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, ApiClientError> {
        let invalid = |message: String| ApiClientError::InvalidUrl {
            url: server_url.to_string(),
            message,
        };

        let mut base_url = Url::parse(server_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("url cannot be used as a base".to_string()));
        }
        // `join` keeps a path prefix only when it ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                message: err.to_string(),
            })
    }
}

#[async_trait]
impl MarketPulseApi for HttpMarketPulseApi {
    async fn get_kpis(
        &self,
        org_id: &str,
        timeframe: &str,
    ) -> Result<KpiResponse, ApiClientError> {
        let url = self.endpoint(KPIS_PATH)?;
        debug!(%url, org_id, timeframe, "fetching kpis");
        let response = self
            .http
            .get(url)
            .query(&[("orgId", org_id), ("timeframe", timeframe)])
            .send()
            .await?;
        decode_response(KPIS_PATH, response).await
    }

    async fn get_insights(
        &self,
        request: &InsightsRequest,
    ) -> Result<InsightsResponse, ApiClientError> {
        let url = self.endpoint(INSIGHTS_PATH)?;
        debug!(%url, org_id = %request.org_id, "requesting insights");
        let response = self.http.post(url).json(request).send().await?;
        decode_response(INSIGHTS_PATH, response).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, ApiClientError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        return Err(ApiClientError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message: status_message(status.canonical_reason(), &body),
        });
    }

    serde_json::from_slice(&body).map_err(|err| ApiClientError::Decode {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

fn status_message(reason: Option<&str>, body: &[u8]) -> String {
    if let Ok(api_error) = serde_json::from_slice::<ApiError>(body) {
        if !api_error.message.trim().is_empty() {
            return api_error.message;
        }
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if !text.is_empty() {
        return text;
    }

    reason.unwrap_or("request failed").to_string()
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
