use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::error::SniperError;

/// Poll interval while waiting for a transaction to confirm.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The on-chain operations the transaction pipeline needs. A trait seam so
/// the pipeline's retry behavior can be exercised without a validator.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Submit a signed transaction with preflight checks disabled.
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SniperError>;

    /// Block until the transaction confirms, fails, or `timeout` elapses.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<(), SniperError>;

    /// Final ledger status lookup: `true` iff the transaction landed with no
    /// error recorded. Used to reconcile after a confirmation timeout.
    async fn transaction_landed(&self, signature: &Signature) -> Result<bool, SniperError>;
}

#[derive(Clone)]
pub struct SolanaClient {
    rpc_client: Arc<RpcClient>,
}

impl SolanaClient {
    pub fn new(rpc_url: &str) -> Self {
        let rpc_client =
            RpcClient::new_with_commitment(rpc_url.to_string(), CommitmentConfig::confirmed());
        Self {
            rpc_client: Arc::new(rpc_client),
        }
    }

    /// One cheap RPC round trip to surface connection problems at startup.
    pub async fn check_connection(&self) -> Result<(), SniperError> {
        match self.rpc_client.get_latest_blockhash().await {
            Ok(_) => {
                info!("Successfully connected to Solana RPC: {}", self.rpc_client.url());
                Ok(())
            }
            Err(e) => {
                error!("Failed to connect to Solana RPC: {}", e);
                Err(SniperError::Solana(format!("RPC connection failed: {}", e)))
            }
        }
    }

    /// Raw balance of the wallet's associated token account for `mint`.
    /// A missing account reads as zero, not as an error.
    pub async fn get_token_balance(
        &self,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<u64, SniperError> {
        let ata = get_associated_token_address(owner, mint);
        match self.rpc_client.get_token_account_balance(&ata).await {
            Ok(balance) => balance
                .amount
                .parse::<u64>()
                .map_err(|e| SniperError::Solana(format!("Unparseable token balance: {}", e))),
            Err(e) => {
                let message = e.to_string();
                if message.contains("could not find account")
                    || message.contains("AccountNotFound")
                    || message.contains("Invalid param")
                {
                    warn!("Token account {} not found for mint {}, assuming balance 0", ata, mint);
                    Ok(0)
                } else {
                    Err(SniperError::Solana(format!(
                        "Failed to get token balance for {}: {}",
                        mint, message
                    )))
                }
            }
        }
    }

    /// The wallet's associated token account for `mint`, if it already exists
    /// on chain. The trade API creates the account itself when none is passed.
    pub async fn existing_token_account(&self, owner: &Pubkey, mint: &Pubkey) -> Option<Pubkey> {
        let ata = get_associated_token_address(owner, mint);
        match self.rpc_client.get_account(&ata).await {
            Ok(_) => Some(ata),
            Err(e) => {
                debug!("No existing token account {} for mint {}: {}", ata, mint, e);
                None
            }
        }
    }
}

#[async_trait]
impl TransactionSender for SolanaClient {
    async fn send_transaction(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<Signature, SniperError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(CommitmentLevel::Processed),
            encoding: None,
            max_retries: None,
            min_context_slot: None,
        };
        let signature = self
            .rpc_client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| SniperError::Transaction(format!("Send failed: {}", e)))?;
        debug!("Transaction sent with signature: {}", signature);
        Ok(signature)
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<(), SniperError> {
        let start_time = Instant::now();
        loop {
            let statuses = self
                .rpc_client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| SniperError::Solana(format!("Status check failed: {}", e)))?;

            match statuses.value.first().cloned().flatten() {
                Some(status) => {
                    return match status.err {
                        None => {
                            info!("Transaction {} confirmed", signature);
                            Ok(())
                        }
                        Some(e) => {
                            error!("Transaction {} failed: {:?}", signature, e);
                            Err(SniperError::TransactionFailed(format!("{:?}", e)))
                        }
                    };
                }
                None => debug!("Transaction {} status not yet available...", signature),
            }

            if start_time.elapsed() > timeout {
                warn!("Timeout waiting for transaction {} confirmation", signature);
                return Err(SniperError::ConfirmationTimeout);
            }

            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    async fn transaction_landed(&self, signature: &Signature) -> Result<bool, SniperError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match self
            .rpc_client
            .get_transaction_with_config(signature, config)
            .await
        {
            Ok(details) => {
                let landed = details
                    .transaction
                    .meta
                    .map(|meta| meta.err.is_none())
                    .unwrap_or(false);
                Ok(landed)
            }
            Err(e) => {
                debug!("No final status for transaction {}: {}", signature, e);
                Ok(false)
            }
        }
    }
}
