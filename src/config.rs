use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::SniperError;

/// Default public mainnet endpoint. Works for testing but is rate limited
/// and unsuitable for production use; main() warns when it is in effect.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Hard gates a discovered token must clear before a buy is attempted.
/// Fixed at startup, never mutated at runtime.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ValidationThresholds {
    pub min_age_minutes: f64,
    pub max_age_minutes: f64,
    pub min_liquidity_usd: f64,
    pub min_market_cap_usd: f64,
    pub min_mcap_fdv_ratio: f64,
    pub max_risk_score: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_age_minutes: 10.0,
            max_age_minutes: 6000.0,
            min_liquidity_usd: 100.0,
            min_market_cap_usd: 100.0,
            min_mcap_fdv_ratio: 0.5,
            max_risk_score: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub rpc_url: String,
    pub wallet_private_key: String,

    pub buy_amount_usd: f64,
    pub slippage_bps: u32,
    /// Sell trigger as a multiple of the purchase price (1.01 = +1%).
    pub take_profit_multiplier: f64,
    /// Raydium auto-fee tier: "vh", "h" or "m".
    pub priority_fee_tier: String,

    pub thresholds: ValidationThresholds,

    // Optional messaging gateway, loaded for parity with deployments that
    // use it; not consumed by the trading loop.
    pub grpc_url: Option<String>,
    pub grpc_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let thresholds = ValidationThresholds {
            min_age_minutes: parse_env_or("MIN_TOKEN_AGE_MINUTES", 10.0),
            max_age_minutes: parse_env_or("MAX_TOKEN_AGE_MINUTES", 6000.0),
            min_liquidity_usd: parse_env_or("MIN_LIQUIDITY_USD", 100.0),
            min_market_cap_usd: parse_env_or("MIN_MARKET_CAP_USD", 100.0),
            min_mcap_fdv_ratio: parse_env_or("MIN_MCAP_FDV_RATIO", 0.5),
            max_risk_score: parse_env_or("MAX_RISK_SCORE", 1.0),
        };

        let config = Self {
            rpc_url: env::var("RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            wallet_private_key: env::var("WALLET_PRIVATE_KEY")
                .context("WALLET_PRIVATE_KEY not set in environment")?,

            buy_amount_usd: parse_env_or("BUY_AMOUNT_USD", 0.1),
            slippage_bps: env::var("SLIPPAGE_BPS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("Failed to parse SLIPPAGE_BPS")?,
            take_profit_multiplier: env::var("TAKE_PROFIT_MULTIPLIER")
                .unwrap_or_else(|_| "1.01".to_string())
                .parse()
                .context("Failed to parse TAKE_PROFIT_MULTIPLIER")?,
            priority_fee_tier: env::var("PRIORITY_FEE_TIER").unwrap_or_else(|_| "h".to_string()),

            thresholds,

            grpc_url: env::var("GRPC_URL").ok(),
            grpc_token: env::var("GRPC_TOKEN").ok(),
        };

        if config.buy_amount_usd <= 0.0 {
            return Err(SniperError::Config("BUY_AMOUNT_USD must be positive".to_string()).into());
        }
        if config.take_profit_multiplier <= 1.0 {
            return Err(SniperError::Config(
                "TAKE_PROFIT_MULTIPLIER must be greater than 1.0".to_string(),
            )
            .into());
        }

        Ok(config)
    }

    pub fn uses_default_rpc(&self) -> bool {
        self.rpc_url == DEFAULT_RPC_URL
    }
}

fn parse_env_or(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
