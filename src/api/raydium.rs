use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::SniperError;

const RAYDIUM_API_BASE_URL: &str = "https://api-v3.raydium.io";
const RAYDIUM_SWAP_HOST: &str = "https://transaction-v1.raydium.io";

/// Transaction format requested from the trade API.
pub const TX_VERSION_V0: &str = "V0";

/// Wrapped-SOL mint, the native side of every swap this bot makes.
pub fn sol_mint() -> String {
    spl_token::native_mint::id().to_string()
}

#[derive(Debug, Clone)]
pub struct RaydiumClient {
    client: Client,
    api_host: String,
    swap_host: String,
}

/// A swap quote as returned by the compute endpoint. The raw body is passed
/// back to the build endpoint wholesale, so it is kept opaque; consumed
/// exactly once by the transaction pipeline.
#[derive(Debug, Clone)]
pub struct SwapQuote {
    pub raw: Value,
    pub tx_version: String,
    pub is_input_sol: bool,
    pub is_output_sol: bool,
}

impl SwapQuote {
    /// Output amount the aggregator expects to deliver, in base units.
    pub fn output_amount(&self) -> Option<u64> {
        let field = self.raw.pointer("/data/outputAmount")?;
        match field {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }
}

// --- Wire structs ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    /// The fee endpoint reports integers but the build endpoint wants a string.
    pub compute_unit_price_micro_lamports: String,
    pub swap_response: Value,
    pub tx_version: String,
    pub wallet: String,
    pub wrap_sol: bool,
    pub unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_account: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SwapTransactionResponse {
    data: Vec<SwapTransactionItem>,
}

#[derive(Debug, Deserialize)]
struct SwapTransactionItem {
    transaction: String,
}

#[derive(Debug, Deserialize)]
struct PriorityFeeResponse {
    data: PriorityFeeData,
}

#[derive(Debug, Deserialize)]
struct PriorityFeeData {
    default: PriorityFeeTiers,
}

#[derive(Debug, Deserialize)]
struct PriorityFeeTiers {
    vh: u64,
    h: u64,
    m: u64,
}

// --- Raydium client implementation ---

impl RaydiumClient {
    pub fn new() -> Self {
        Self::with_hosts(
            RAYDIUM_API_BASE_URL.to_string(),
            RAYDIUM_SWAP_HOST.to_string(),
        )
    }

    pub fn with_hosts(api_host: String, swap_host: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client for Raydium"),
            api_host,
            swap_host,
        }
    }

    /// Requests a swap-base-in quote. Returns the full response body, which
    /// the build endpoint consumes unmodified. A body with `success: false`
    /// is an API error carrying the server's `msg`.
    pub async fn compute_swap_base_in(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<Value> {
        let url = format!("{}/compute/swap-base-in", self.swap_host);
        let params = [
            ("inputMint", input_mint.to_string()),
            ("outputMint", output_mint.to_string()),
            ("amount", amount.to_string()),
            ("slippageBps", slippage_bps.to_string()),
            ("txVersion", TX_VERSION_V0.to_string()),
        ];
        debug!("Requesting swap quote: {:?}", params);

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Failed to send quote request to Raydium trade API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SniperError::Api(format!(
                "Raydium compute API failed with status {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse Raydium compute response")?;

        if body.get("success").and_then(Value::as_bool) != Some(true) {
            let msg = body
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            return Err(SniperError::Api(format!("Raydium quote rejected: {}", msg)).into());
        }

        Ok(body)
    }

    /// Current priority fee estimate in micro-lamports for the given tier.
    pub async fn priority_fee_micro_lamports(&self, tier: &str) -> Result<u64> {
        let url = format!("{}/main/auto-fee", self.api_host);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send priority fee request to Raydium API")?;

        if !response.status().is_success() {
            return Err(SniperError::Api(format!(
                "Raydium fee API failed with status {}",
                response.status()
            ))
            .into());
        }

        let fees: PriorityFeeResponse = response
            .json()
            .await
            .context("Failed to parse Raydium fee response")?;

        let fee = match tier {
            "vh" => fees.data.default.vh,
            "m" => fees.data.default.m,
            // "h" is the documented default; fall back to it for unknown tiers
            _ => fees.data.default.h,
        };
        debug!("Priority fee ({} tier): {} micro-lamports", tier, fee);
        Ok(fee)
    }

    /// Asks the trade API to build the serialized transactions for a quote.
    /// Returns the raw transaction bytes in the order they must be submitted.
    pub async fn build_swap_transactions(
        &self,
        request: &SwapTransactionRequest,
    ) -> Result<Vec<Vec<u8>>> {
        let url = format!("{}/transaction/swap-base-in", self.swap_host);
        debug!("Requesting swap transactions for wallet {}", request.wallet);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to send build request to Raydium trade API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Raydium build API error: {} - {}", status, error_text);
            return Err(SniperError::Api(format!(
                "Raydium build API failed with status {}: {}",
                status, error_text
            ))
            .into());
        }

        let built: SwapTransactionResponse = response
            .json()
            .await
            .context("Failed to parse Raydium build response")?;

        let mut transactions = Vec::with_capacity(built.data.len());
        for item in &built.data {
            let bytes = STANDARD
                .decode(&item.transaction)
                .context("Failed to decode base64 swap transaction")?;
            transactions.push(bytes);
        }
        debug!("Received {} serialized transactions", transactions.len());
        Ok(transactions)
    }
}

impl Default for RaydiumClient {
    fn default() -> Self {
        Self::new()
    }
}
