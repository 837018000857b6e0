//! API client for the perf-monitor agent

use anyhow::{Context, Result};
use monitor_lib::{AnomalyRecord, AnomalyReport, HealthStatus, RealtimeStatus, Warning};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the agent's HTTP surface
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    ///
    /// Health endpoints answer 503 with a JSON body; `accept_unavailable`
    /// treats that as a normal response.
    async fn get_with<T: DeserializeOwned>(&self, path: &str, accept_unavailable: bool) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let unavailable = status == reqwest::StatusCode::SERVICE_UNAVAILABLE;
        if !status.is_success() && !(accept_unavailable && unavailable) {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_with(path, false).await
    }

    pub async fn status(&self) -> Result<RealtimeStatus> {
        self.get("api/v1/status").await
    }

    pub async fn report(&self) -> Result<AnomalyReport> {
        self.get("api/v1/report").await
    }

    pub async fn anomalies(&self, limit: Option<usize>) -> Result<Vec<AnomalyRecord>> {
        self.get(&with_limit("api/v1/anomalies", limit)).await
    }

    pub async fn warnings(&self, limit: Option<usize>) -> Result<Vec<Warning>> {
        self.get(&with_limit("api/v1/warnings", limit)).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_with("healthz", true).await
    }
}

fn with_limit(path: &str, limit: Option<usize>) -> String {
    match limit {
        Some(limit) => format!("{}?limit={}", path, limit),
        None => path.to_string(),
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub instance: String,
    pub is_detecting: bool,
}
