use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::dexscreener::DexScreenerClient;
use crate::error::SniperError;
use crate::models::token::OpenPosition;
use crate::solana::client::SolanaClient;
use crate::solana::wallet::WalletManager;
use crate::trading::pipeline::TxPipeline;
use crate::trading::quote::QuoteService;

/// Price poll rate against DexScreener while watching.
const POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Backoff after a failed price fetch.
const PRICE_FAILURE_BACKOFF: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    Watching,
    Sold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchAction {
    /// Price feed gave nothing usable; back off and ask again.
    AwaitPriceFeed,
    /// Below target; keep the position and poll again.
    HoldPosition,
    /// Target reached; start the sell path.
    TriggerSell,
}

/// Decision logic for one price observation against the fixed target.
#[derive(Debug, Clone, Copy)]
struct PriceWatcher {
    target_price: f64,
}

impl PriceWatcher {
    fn new(target_price: f64) -> Self {
        Self { target_price }
    }

    fn observe(&self, price: Option<f64>) -> WatchAction {
        match price {
            None => WatchAction::AwaitPriceFeed,
            Some(p) if p >= self.target_price => WatchAction::TriggerSell,
            Some(_) => WatchAction::HoldPosition,
        }
    }
}

/// Watches a purchased token until the take-profit target is reached, then
/// sells through the quote service and transaction pipeline. Runs until the
/// sell lands (`Ok`) or a local unrecoverable error aborts the cycle (`Err`,
/// handled by the orchestrator's outer backoff).
pub struct Monitor {
    dexscreener: Arc<DexScreenerClient>,
    quote_service: Arc<QuoteService>,
    pipeline: Arc<TxPipeline>,
    solana: Arc<SolanaClient>,
    wallet: Arc<WalletManager>,
    take_profit_multiplier: f64,
    poll_interval: Duration,
    price_failure_backoff: Duration,
}

impl Monitor {
    pub fn new(
        dexscreener: Arc<DexScreenerClient>,
        quote_service: Arc<QuoteService>,
        pipeline: Arc<TxPipeline>,
        solana: Arc<SolanaClient>,
        wallet: Arc<WalletManager>,
        take_profit_multiplier: f64,
    ) -> Self {
        Self {
            dexscreener,
            quote_service,
            pipeline,
            solana,
            wallet,
            take_profit_multiplier,
            poll_interval: POLL_INTERVAL,
            price_failure_backoff: PRICE_FAILURE_BACKOFF,
        }
    }

    #[cfg(test)]
    fn with_intervals(mut self, poll_interval: Duration, price_failure_backoff: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.price_failure_backoff = price_failure_backoff;
        self
    }

    pub async fn run(&self, position: &OpenPosition) -> Result<()> {
        if position.output_amount_lamports == 0 {
            return Err(SniperError::InsufficientBalance(
                "Recorded output amount is zero".to_string(),
            )
            .into());
        }

        let token_address = &position.token_address;
        let mint = Pubkey::from_str(token_address).context("Invalid purchased token address")?;

        let purchase_price = self
            .dexscreener
            .token_price_usd(token_address)
            .await
            .context("Failed to fetch purchase price")?
            .ok_or_else(|| {
                SniperError::Api(format!("No purchase price available for {}", token_address))
            })?;

        let target_price = purchase_price * self.take_profit_multiplier;
        info!(
            "Monitoring {} from ${} for target ${} ({}x)",
            token_address, purchase_price, target_price, self.take_profit_multiplier
        );

        let watcher = PriceWatcher::new(target_price);
        let mut state = MonitorState::Watching;

        while state == MonitorState::Watching {
            let price = match self.dexscreener.token_price_usd(token_address).await {
                Ok(price) => price,
                Err(e) => {
                    error!("Error fetching current price for {}: {}", token_address, e);
                    None
                }
            };

            match watcher.observe(price) {
                WatchAction::AwaitPriceFeed => {
                    info!("Failed to fetch current price. Retrying in 15 seconds...");
                    tokio::time::sleep(self.price_failure_backoff).await;
                }
                WatchAction::HoldPosition => {
                    info!(
                        "Current price: ${}. Target price: ${}",
                        price.unwrap_or_default(),
                        target_price
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
                WatchAction::TriggerSell => {
                    info!(
                        "Price target reached at ${}. Initiating sell of {}...",
                        price.unwrap_or_default(),
                        token_address
                    );

                    // A transient RPC failure here is a network hiccup, not
                    // a reason to abandon the cycle
                    let balance = match self
                        .solana
                        .get_token_balance(&self.wallet.public_key(), &mint)
                        .await
                    {
                        Ok(balance) => balance,
                        Err(e) if e.is_transient() => {
                            warn!("Balance lookup failed ({}), retrying...", e);
                            tokio::time::sleep(self.price_failure_backoff).await;
                            continue;
                        }
                        Err(e) => {
                            return Err(e).context("Failed to fetch token balance for sell")
                        }
                    };
                    if balance == 0 {
                        return Err(SniperError::InsufficientBalance(
                            "No token balance available for selling".to_string(),
                        )
                        .into());
                    }
                    info!("Token balance available: {}", balance);

                    // A failed sell quote keeps the position and the watch
                    // loop alive; only local errors abort.
                    let Some(quote) = self.quote_service.sell_quote(token_address, balance).await
                    else {
                        warn!("Failed to fetch sell quote. Retrying...");
                        tokio::time::sleep(self.poll_interval).await;
                        continue;
                    };

                    self.pipeline
                        .execute(&quote, token_address)
                        .await
                        .context("Sell transaction execution failed")?;
                    state = MonitorState::Sold;
                }
            }
        }

        info!("Sell completed for {}", token_address);
        Ok(())
    }
}
