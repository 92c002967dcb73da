use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::SniperError;

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com";

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    solana: Option<UsdPrice>,
}

#[derive(Debug, Deserialize)]
struct UsdPrice {
    usd: f64,
}

impl CoinGeckoClient {
    pub fn new() -> Self {
        Self::with_base_url(COINGECKO_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("Failed to create HTTP client for CoinGecko"),
            base_url,
        }
    }

    /// Spot SOL price in USD. The buy-side budget conversion depends on this,
    /// so a missing or non-positive price is an error, not a zero.
    pub async fn sol_price_usd(&self) -> Result<f64> {
        let url = format!("{}/api/v3/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", "solana"), ("vs_currencies", "usd")])
            .send()
            .await
            .context("Failed to send SOL price request to CoinGecko")?;

        if !response.status().is_success() {
            return Err(SniperError::Api(format!(
                "CoinGecko price API failed with status {}",
                response.status()
            ))
            .into());
        }

        let prices: SimplePriceResponse = response
            .json()
            .await
            .context("Failed to parse CoinGecko price response")?;

        let price = prices
            .solana
            .map(|p| p.usd)
            .ok_or_else(|| SniperError::Api("CoinGecko returned no SOL price".to_string()))?;
        if price <= 0.0 {
            return Err(SniperError::Api(format!("Invalid SOL price: {}", price)).into());
        }

        debug!("Current SOL price: ${}", price);
        Ok(price)
    }
}

impl Default for CoinGeckoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sol_price_parses_simple_price() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"solana":{"usd":142.5}}"#)
            .create_async()
            .await;

        let client = CoinGeckoClient::with_base_url(server.url());
        assert_eq!(client.sol_price_usd().await.unwrap(), 142.5);
    }

    #[tokio::test]
    async fn test_sol_price_errors_on_missing_asset() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/v3/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = CoinGeckoClient::with_base_url(server.url());
        assert!(client.sol_price_usd().await.is_err());
    }
}
