use std::sync::Arc;
use tracing::{error, info};

use crate::api::coingecko::CoinGeckoClient;
use crate::api::raydium::{sol_mint, RaydiumClient, SwapQuote, TX_VERSION_V0};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Requests buy/sell swap quotes from the trade API. Quote failures are part
/// of normal operation and come back as `None`, never as a panic or a
/// propagated error.
pub struct QuoteService {
    raydium: Arc<RaydiumClient>,
    coingecko: Arc<CoinGeckoClient>,
    buy_amount_usd: f64,
    slippage_bps: u32,
}

impl QuoteService {
    pub fn new(
        raydium: Arc<RaydiumClient>,
        coingecko: Arc<CoinGeckoClient>,
        buy_amount_usd: f64,
        slippage_bps: u32,
    ) -> Self {
        Self {
            raydium,
            coingecko,
            buy_amount_usd,
            slippage_bps,
        }
    }

    /// Quote for spending the fixed USD budget of SOL on `output_mint`.
    pub async fn buy_quote(&self, output_mint: &str) -> Option<SwapQuote> {
        let sol_price = match self.coingecko.sol_price_usd().await {
            Ok(price) => price,
            Err(e) => {
                error!("Error fetching SOL price: {}", e);
                return None;
            }
        };

        let lamports = usd_to_lamports(self.buy_amount_usd, sol_price);
        if lamports == 0 {
            error!(
                "Buy budget ${} converts to zero lamports at SOL price ${}",
                self.buy_amount_usd, sol_price
            );
            return None;
        }
        info!(
            "Purchasing ${} worth of SOL ({} lamports) for {}",
            self.buy_amount_usd, lamports, output_mint
        );

        match self
            .raydium
            .compute_swap_base_in(&sol_mint(), output_mint, lamports, self.slippage_bps)
            .await
        {
            Ok(raw) => Some(SwapQuote {
                raw,
                tx_version: TX_VERSION_V0.to_string(),
                is_input_sol: true,
                is_output_sol: false,
            }),
            Err(e) => {
                error!("Error fetching swap quote for {}: {}", output_mint, e);
                None
            }
        }
    }

    /// Quote for selling the full held balance of `input_mint` back to SOL.
    pub async fn sell_quote(&self, input_mint: &str, amount: u64) -> Option<SwapQuote> {
        info!("Fetching sell quote for {} units of {} to SOL...", amount, input_mint);
        match self
            .raydium
            .compute_swap_base_in(input_mint, &sol_mint(), amount, self.slippage_bps)
            .await
        {
            Ok(raw) => Some(SwapQuote {
                raw,
                tx_version: TX_VERSION_V0.to_string(),
                is_input_sol: false,
                is_output_sol: true,
            }),
            Err(e) => {
                error!("Error fetching sell quote for {}: {}", input_mint, e);
                None
            }
        }
    }
}

fn usd_to_lamports(usd_amount: f64, sol_price_usd: f64) -> u64 {
    (usd_amount / sol_price_usd * LAMPORTS_PER_SOL).floor() as u64
}
