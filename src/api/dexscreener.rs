use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SniperError;
use crate::models::token::TokenCandidate;

const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";

/// Chain the bot trades on; everything else in the profiles feed is skipped.
pub const TARGET_CHAIN: &str = "solana";
/// Only tokens with a pair on this DEX are considered tradable.
pub const TARGET_DEX: &str = "raydium";

#[derive(Debug, Clone)]
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

// --- Response structs ---

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    #[serde(default)]
    pairs: Option<Vec<TokenPair>>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub chain_id: String,
    pub dex_id: String,
    /// Pair creation time in epoch milliseconds; absent for some pairs.
    pub pair_created_at: Option<i64>,
    /// DexScreener serves the price as a decimal string.
    pub price_usd: Option<String>,
    pub liquidity: Option<PairLiquidity>,
    pub market_cap: Option<f64>,
    pub fdv: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PairLiquidity {
    pub usd: Option<f64>,
}

impl TokenPair {
    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn market_cap_usd(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }

    pub fn fdv_usd(&self) -> f64 {
        self.fdv.unwrap_or(0.0)
    }

    pub fn price_usd_f64(&self) -> Option<f64> {
        let price = self.price_usd.as_deref()?.parse::<f64>().ok()?;
        if price > 0.0 {
            Some(price)
        } else {
            None
        }
    }

    /// Pair age in minutes relative to `now_ms`. `None` when the feed did
    /// not report a creation time.
    pub fn age_minutes(&self, now_ms: i64) -> Option<f64> {
        let created_at = self.pair_created_at?;
        Some((now_ms - created_at) as f64 / 60_000.0)
    }

    pub fn is_target_pair(&self) -> bool {
        self.chain_id == TARGET_CHAIN && self.dex_id == TARGET_DEX
    }
}

// --- DexScreener client implementation ---

impl DexScreenerClient {
    pub fn new() -> Self {
        Self::with_base_url(DEXSCREENER_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("Failed to create HTTP client for DexScreener"),
            base_url,
        }
    }

    /// Fetches the latest token profiles feed (all chains, newest first).
    pub async fn latest_token_profiles(&self) -> Result<Vec<TokenCandidate>> {
        let url = format!("{}/token-profiles/latest/v1", self.base_url);
        debug!("Fetching latest token profiles: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to DexScreener profiles API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SniperError::Api(format!(
                "DexScreener profiles API failed with status {}: {}",
                status, error_text
            ))
            .into());
        }

        let profiles: Vec<TokenCandidate> = response
            .json()
            .await
            .context("Failed to parse DexScreener profiles response")?;
        debug!("Fetched {} token profiles", profiles.len());
        Ok(profiles)
    }

    /// Fetches every trading pair DexScreener tracks for a token.
    pub async fn token_pairs(&self, token_address: &str) -> Result<Vec<TokenPair>> {
        let url = format!("{}/latest/dex/tokens/{}", self.base_url, token_address);
        debug!("Fetching pairs for token {}: {}", token_address, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to DexScreener pairs API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SniperError::Api(format!(
                "DexScreener pairs API failed with status {} for {}: {}",
                status, token_address, error_text
            ))
            .into());
        }

        let pairs_response: TokenPairsResponse = response
            .json()
            .await
            .context("Failed to parse DexScreener pairs response")?;
        Ok(pairs_response.pairs.unwrap_or_default())
    }

    /// Current USD price from the first Raydium pair on the target chain.
    /// `Ok(None)` when no pair carries a usable positive price.
    pub async fn token_price_usd(&self, token_address: &str) -> Result<Option<f64>> {
        let pairs = self.token_pairs(token_address).await?;
        if pairs.is_empty() {
            warn!("No pairs found for token {}", token_address);
            return Ok(None);
        }

        let price = pairs
            .iter()
            .filter(|p| p.is_target_pair())
            .find_map(|p| p.price_usd_f64());

        if price.is_none() {
            warn!("No valid {} pair price for token {}", TARGET_DEX, token_address);
        }
        Ok(price)
    }
}

impl Default for DexScreenerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(price: Option<&str>, dex_id: &str) -> TokenPair {
        TokenPair {
            chain_id: TARGET_CHAIN.to_string(),
            dex_id: dex_id.to_string(),
            pair_created_at: Some(0),
            price_usd: price.map(|p| p.to_string()),
            liquidity: None,
            market_cap: None,
            fdv: None,
        }
    }

    #[test]
    fn test_price_parsing_rejects_non_positive() {
        assert_eq!(pair(Some("0.5"), TARGET_DEX).price_usd_f64(), Some(0.5));
        assert_eq!(pair(Some("0"), TARGET_DEX).price_usd_f64(), None);
        assert_eq!(pair(Some("garbage"), TARGET_DEX).price_usd_f64(), None);
        assert_eq!(pair(None, TARGET_DEX).price_usd_f64(), None);
    }

    #[test]
    fn test_age_minutes() {
        let mut p = pair(None, TARGET_DEX);
        p.pair_created_at = Some(1_000_000);
        assert_eq!(p.age_minutes(1_000_000 + 30 * 60_000), Some(30.0));
        p.pair_created_at = None;
        assert_eq!(p.age_minutes(1_000_000), None);
    }

    #[tokio::test]
    async fn test_token_price_prefers_raydium_pair() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "pairs": [
                { "chainId": "solana", "dexId": "orca", "priceUsd": "9.99" },
                { "chainId": "solana", "dexId": "raydium", "priceUsd": "1.25" }
            ]
        });
        let _m = server
            .mock("GET", "/latest/dex/tokens/MintA")
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = DexScreenerClient::with_base_url(server.url());
        let price = client.token_price_usd("MintA").await.unwrap();
        assert_eq!(price, Some(1.25));
    }
}
