use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const RUGCHECK_BASE_URL: &str = "https://api.rugcheck.xyz";

#[derive(Debug, Clone)]
pub struct RugCheckClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ReportSummary {
    score: Option<f64>,
}

impl RugCheckClient {
    pub fn new() -> Self {
        Self::with_base_url(RUGCHECK_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("Failed to create HTTP client for RugCheck"),
            base_url,
        }
    }

    /// Fetches the risk score for a token. Returns `Ok(None)` when the API
    /// answers but has no usable report; transport errors propagate so the
    /// caller can decide how much it cares.
    pub async fn risk_score(&self, token_address: &str) -> Result<Option<f64>> {
        let url = format!("{}/v1/tokens/{}/report/summary", self.base_url, token_address);
        debug!("Fetching RugCheck report for {}: {}", token_address, url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to RugCheck API")?;

        if !response.status().is_success() {
            warn!(
                "RugCheck API error for token {}: {}",
                token_address,
                response.status()
            );
            return Ok(None);
        }

        let summary: ReportSummary = match response.json().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Failed to parse RugCheck response for {}: {}", token_address, e);
                return Ok(None);
            }
        };

        Ok(summary.score)
    }
}

impl Default for RugCheckClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_risk_score_tolerates_api_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/tokens/MintA/report/summary")
            .with_status(500)
            .create_async()
            .await;

        let client = RugCheckClient::with_base_url(server.url());
        let score = client.risk_score("MintA").await.unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn test_risk_score_parses_summary() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v1/tokens/MintA/report/summary")
            .with_status(200)
            .with_body(r#"{"score": 3.0}"#)
            .create_async()
            .await;

        let client = RugCheckClient::with_base_url(server.url());
        let score = client.risk_score("MintA").await.unwrap();
        assert_eq!(score, Some(3.0));
    }
}
