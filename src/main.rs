use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod models;
mod solana;
mod trading;

use crate::api::coingecko::CoinGeckoClient;
use crate::api::dexscreener::DexScreenerClient;
use crate::api::raydium::RaydiumClient;
use crate::api::rugcheck::RugCheckClient;
use crate::config::Config;
use crate::solana::client::{SolanaClient, TransactionSender};
use crate::solana::wallet::WalletManager;
use crate::trading::discovery::Discovery;
use crate::trading::monitor::Monitor;
use crate::trading::orchestrator::Orchestrator;
use crate::trading::pipeline::TxPipeline;
use crate::trading::quote::QuoteService;
use crate::trading::retry::RetryPolicy;
use crate::trading::validator::TokenValidator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    dotenv().ok();

    let config = Config::load()?;
    info!("Configuration loaded successfully");
    if config.uses_default_rpc() {
        warn!(
            "Using the free public RPC node might cause unexpected errors. \
             A paid RPC node is strongly recommended."
        );
    }

    if config.grpc_url.is_some() || config.grpc_token.is_some() {
        info!("Messaging gateway configured; not used by the trading loop");
    }

    let solana_client = Arc::new(SolanaClient::new(&config.rpc_url));
    solana_client.check_connection().await?;

    let wallet = WalletManager::new(&config.wallet_private_key)?;
    info!("Wallet loaded with address: {}", wallet.public_key());

    let dexscreener = Arc::new(DexScreenerClient::new());
    let rugcheck = Arc::new(RugCheckClient::new());
    let coingecko = Arc::new(CoinGeckoClient::new());
    let raydium = Arc::new(RaydiumClient::new());

    let validator = TokenValidator::new(
        dexscreener.clone(),
        rugcheck.clone(),
        config.thresholds.clone(),
    );
    let discovery = Discovery::new(dexscreener.clone(), validator);
    let quote_service = Arc::new(QuoteService::new(
        raydium.clone(),
        coingecko.clone(),
        config.buy_amount_usd,
        config.slippage_bps,
    ));

    let sender: Arc<dyn TransactionSender> = solana_client.clone();
    let pipeline = Arc::new(TxPipeline::new(
        raydium.clone(),
        wallet.clone(),
        solana_client.clone(),
        sender,
        config.priority_fee_tier.clone(),
        RetryPolicy::default(),
    ));
    let monitor = Monitor::new(
        dexscreener.clone(),
        quote_service.clone(),
        pipeline.clone(),
        solana_client.clone(),
        wallet.clone(),
        config.take_profit_multiplier,
    );

    let mut orchestrator = Orchestrator::new(discovery, quote_service, pipeline, monitor);
    info!("Starting sniper trading loop...");
    orchestrator.run().await;

    Ok(())
}
