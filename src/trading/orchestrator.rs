use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::models::token::OpenPosition;
use crate::trading::discovery::Discovery;
use crate::trading::monitor::Monitor;
use crate::trading::pipeline::TxPipeline;
use crate::trading::quote::QuoteService;

/// Backoff after a feed poll that produced no valid candidate.
const DISCOVERY_BACKOFF: Duration = Duration::from_secs(20);
/// Backoff after any quote, pipeline or monitoring failure.
const TRADE_BACKOFF: Duration = Duration::from_secs(30);

/// The top-level loop: find and buy one token, monitor it until sold, repeat.
/// Owns the single `Option<OpenPosition>` explicitly; there is no shared
/// mutable position state anywhere else. Never exits on its own.
pub struct Orchestrator {
    discovery: Discovery,
    quote_service: Arc<QuoteService>,
    pipeline: Arc<TxPipeline>,
    monitor: Monitor,
    position: Option<OpenPosition>,
}

impl Orchestrator {
    pub fn new(
        discovery: Discovery,
        quote_service: Arc<QuoteService>,
        pipeline: Arc<TxPipeline>,
        monitor: Monitor,
    ) -> Self {
        Self {
            discovery,
            quote_service,
            pipeline,
            monitor,
            position: None,
        }
    }

    /// Run forever. Every failure inside an iteration resolves to a fixed
    /// backoff; nothing here is fatal to the process.
    pub async fn run(&mut self) {
        loop {
            if let Some(delay) = self.step().await {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// One iteration: enter a position if none is open, otherwise watch it.
    /// Returns the backoff to apply before the next iteration, if any.
    async fn step(&mut self) -> Option<Duration> {
        if self.position.is_none() {
            self.try_enter().await
        } else {
            self.watch_position().await
        }
    }

    async fn try_enter(&mut self) -> Option<Duration> {
        let Some(candidate) = self.discovery.find_candidate().await else {
            warn!("No valid token passed validation checks. Retrying in 20 seconds...");
            return Some(DISCOVERY_BACKOFF);
        };
        info!("Valid token found: {}", candidate.token_address);

        let Some(quote) = self.quote_service.buy_quote(&candidate.token_address).await else {
            error!("Failed to fetch swap quote. Retrying in 30 seconds...");
            return Some(TRADE_BACKOFF);
        };
        // A quote without a usable output amount would open a position the
        // monitor can never sell, so it counts as a failed buy attempt.
        let output_amount = match quote.output_amount() {
            Some(amount) if amount > 0 => amount,
            _ => {
                error!("Swap quote has no usable output amount. Retrying in 30 seconds...");
                return Some(TRADE_BACKOFF);
            }
        };

        match self.pipeline.execute(&quote, &candidate.token_address).await {
            Ok(()) => {
                info!(
                    "Token purchased: {}. Starting monitoring...",
                    candidate.token_address
                );
                self.position = Some(OpenPosition {
                    token_address: candidate.token_address,
                    output_amount_lamports: output_amount,
                });
                None
            }
            Err(e) => {
                error!(
                    "Buy transaction pipeline failed: {:#}. Retrying in 30 seconds...",
                    e
                );
                Some(TRADE_BACKOFF)
            }
        }
    }

    async fn watch_position(&mut self) -> Option<Duration> {
        let position = self.position.clone()?;
        match self.monitor.run(&position).await {
            Ok(()) => {
                info!("Position in {} closed", position.token_address);
                self.position = None;
                None
            }
            Err(e) => {
                // Position stays open; monitoring resumes after the backoff
                error!(
                    "Monitoring cycle aborted: {:#}. Retrying in 30 seconds...",
                    e
                );
                Some(TRADE_BACKOFF)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signature};
    use solana_sdk::signer::Signer;
    use solana_sdk::transaction::{Transaction, VersionedTransaction};

    use crate::api::coingecko::CoinGeckoClient;
    use crate::api::dexscreener::DexScreenerClient;
    use crate::api::raydium::RaydiumClient;
    use crate::api::rugcheck::RugCheckClient;
    use crate::config::ValidationThresholds;
    use crate::error::SniperError;
    use crate::solana::client::{SolanaClient, TransactionSender};
    use crate::solana::wallet::WalletManager;
    use crate::trading::retry::RetryPolicy;
    use crate::trading::validator::TokenValidator;

    struct AlwaysConfirms;

    #[async_trait]
    impl TransactionSender for AlwaysConfirms {
        async fn send_transaction(
            &self,
            _tx: &VersionedTransaction,
        ) -> Result<Signature, SniperError> {
            Ok(Signature::new_unique())
        }

        async fn confirm_transaction(
            &self,
            _sig: &Signature,
            _timeout: Duration,
        ) -> Result<(), SniperError> {
            Ok(())
        }

        async fn transaction_landed(&self, _sig: &Signature) -> Result<bool, SniperError> {
            Ok(true)
        }
    }

    /// Every component wired against one mock server, mirroring main().
    fn build_orchestrator(base_url: &str, wallet: Arc<WalletManager>) -> Orchestrator {
        let dexscreener = Arc::new(DexScreenerClient::with_base_url(base_url.to_string()));
        let rugcheck = Arc::new(RugCheckClient::with_base_url(base_url.to_string()));
        let coingecko = Arc::new(CoinGeckoClient::with_base_url(base_url.to_string()));
        let raydium = Arc::new(RaydiumClient::with_hosts(
            base_url.to_string(),
            base_url.to_string(),
        ));
        let solana = Arc::new(SolanaClient::new(base_url));

        let validator = TokenValidator::new(
            dexscreener.clone(),
            rugcheck.clone(),
            ValidationThresholds::default(),
        );
        let discovery = Discovery::new(dexscreener.clone(), validator);
        let quote_service = Arc::new(QuoteService::new(raydium.clone(), coingecko, 0.1, 50));
        let pipeline = Arc::new(TxPipeline::new(
            raydium,
            wallet.clone(),
            solana.clone(),
            Arc::new(AlwaysConfirms),
            "h".to_string(),
            RetryPolicy::new(2, Duration::from_millis(1)),
        ));
        let monitor = Monitor::new(
            dexscreener,
            quote_service.clone(),
            pipeline.clone(),
            solana,
            wallet,
            1.01,
        );
        Orchestrator::new(discovery, quote_service, pipeline, monitor)
    }

    /// Profiles feed, pair data, risk report and SOL price for one valid
    /// candidate, enough to carry discovery through to the buy quote.
    async fn mount_candidate_mocks(
        server: &mut mockito::ServerGuard,
        mint: &str,
    ) -> Vec<mockito::Mock> {
        let profiles = server
            .mock("GET", "/token-profiles/latest/v1")
            .with_status(200)
            .with_body(
                serde_json::json!([
                    { "chainId": "solana", "tokenAddress": mint }
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let pair_created_at = Utc::now().timestamp_millis() - 30 * 60_000;
        let pairs = server
            .mock("GET", format!("/latest/dex/tokens/{}", mint).as_str())
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "pairs": [{
                        "chainId": "solana",
                        "dexId": "raydium",
                        "pairCreatedAt": pair_created_at,
                        "priceUsd": "0.001",
                        "liquidity": { "usd": 5000.0 },
                        "marketCap": 50000.0,
                        "fdv": 60000.0
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let risk = server
            .mock("GET", format!("/v1/tokens/{}/report/summary", mint).as_str())
            .with_status(200)
            .with_body(r#"{"score": 0.0}"#)
            .create_async()
            .await;

        let sol_price = server
            .mock("GET", "/api/v3/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"solana":{"usd":100.0}}"#)
            .create_async()
            .await;

        vec![profiles, pairs, risk, sol_price]
    }

    #[tokio::test]
    async fn test_discovery_failure_backs_off_without_position() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/token-profiles/latest/v1")
            .with_status(500)
            .create_async()
            .await;

        let wallet = WalletManager::from_keypair(Keypair::new());
        let mut orchestrator = build_orchestrator(&server.url(), wallet);

        let backoff = orchestrator.step().await;
        assert_eq!(backoff, Some(DISCOVERY_BACKOFF));
        assert!(orchestrator.position.is_none());
    }

    #[tokio::test]
    async fn test_buy_flow_opens_position_with_quoted_output() {
        let mut server = mockito::Server::new_async().await;
        let keypair = Keypair::new();
        let wallet_pubkey = keypair.pubkey();
        let wallet = WalletManager::from_keypair(keypair);
        let mint = Pubkey::new_unique().to_string();

        let _candidate = mount_candidate_mocks(&mut server, &mint).await;

        let _compute = server
            .mock("GET", "/compute/swap-base-in")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":true,"data":{"outputAmount":"123456789"}}"#)
            .create_async()
            .await;

        let _fee = server
            .mock("GET", "/main/auto-fee")
            .with_status(200)
            .with_body(r#"{"data":{"default":{"vh":300,"h":200,"m":100}}}"#)
            .create_async()
            .await;

        let tx = VersionedTransaction::from(Transaction::new_with_payer(
            &[],
            Some(&wallet_pubkey),
        ));
        let tx_b64 = {
            use base64::{engine::general_purpose::STANDARD, Engine as _};
            STANDARD.encode(bincode::serialize(&tx).unwrap())
        };
        let _build = server
            .mock("POST", "/transaction/swap-base-in")
            .with_status(200)
            .with_body(serde_json::json!({ "data": [{ "transaction": tx_b64 }] }).to_string())
            .create_async()
            .await;

        let mut orchestrator = build_orchestrator(&server.url(), wallet);
        let backoff = orchestrator.step().await;

        assert_eq!(backoff, None);
        let position = orchestrator.position.as_ref().expect("position should be open");
        assert_eq!(position.token_address, mint);
        assert_eq!(position.output_amount_lamports, 123_456_789);
    }

    #[tokio::test]
    async fn test_quote_without_output_amount_is_a_failed_buy() {
        let mut server = mockito::Server::new_async().await;
        let wallet = WalletManager::from_keypair(Keypair::new());
        let mint = Pubkey::new_unique().to_string();

        let _candidate = mount_candidate_mocks(&mut server, &mint).await;

        // Nominally successful compute response with no outputAmount field
        let _compute = server
            .mock("GET", "/compute/swap-base-in")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"success":true,"data":{}}"#)
            .create_async()
            .await;

        let mut orchestrator = build_orchestrator(&server.url(), wallet);
        let backoff = orchestrator.step().await;

        assert_eq!(backoff, Some(TRADE_BACKOFF));
        assert!(orchestrator.position.is_none());
    }
}
