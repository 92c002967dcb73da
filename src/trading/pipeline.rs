use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    transaction::{Transaction, VersionedTransaction},
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::raydium::{RaydiumClient, SwapQuote, SwapTransactionRequest, TX_VERSION_V0};
use crate::error::SniperError;
use crate::solana::client::{SolanaClient, TransactionSender};
use crate::solana::wallet::WalletManager;
use crate::trading::retry::RetryPolicy;

/// Upper bound on waiting for any single transaction to confirm.
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Turns a swap quote into signed, submitted, confirmed transactions.
///
/// Submission is best-effort per transaction: each one gets a bounded number
/// of attempts with status reconciliation after timeouts, and a transaction
/// that exhausts its attempts is abandoned without aborting the rest of the
/// batch. There is no atomicity across a multi-transaction swap.
pub struct TxPipeline {
    raydium: Arc<RaydiumClient>,
    wallet: Arc<WalletManager>,
    solana: Arc<SolanaClient>,
    sender: Arc<dyn TransactionSender>,
    priority_fee_tier: String,
    retry: RetryPolicy,
}

impl TxPipeline {
    pub fn new(
        raydium: Arc<RaydiumClient>,
        wallet: Arc<WalletManager>,
        solana: Arc<SolanaClient>,
        sender: Arc<dyn TransactionSender>,
        priority_fee_tier: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            raydium,
            wallet,
            solana,
            sender,
            priority_fee_tier,
            retry,
        }
    }

    /// Build, sign, submit and confirm the transactions for `quote`.
    /// `token_mint` is the non-native side of the swap, used to locate the
    /// wallet's existing token account if there is one.
    pub async fn execute(&self, quote: &SwapQuote, token_mint: &str) -> Result<()> {
        let fee = self
            .raydium
            .priority_fee_micro_lamports(&self.priority_fee_tier)
            .await
            .context("Failed to fetch priority fee estimate")?;

        let mint =
            Pubkey::from_str(token_mint).context("Invalid token mint address for swap")?;
        let token_account = self
            .solana
            .existing_token_account(&self.wallet.public_key(), &mint)
            .await
            .map(|ata| ata.to_string());

        // The native side wraps/unwraps SOL and needs no account; the token
        // side is passed only when the ATA already exists on chain.
        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: fee.to_string(),
            swap_response: quote.raw.clone(),
            tx_version: quote.tx_version.clone(),
            wallet: self.wallet.public_key().to_string(),
            wrap_sol: quote.is_input_sol,
            unwrap_sol: quote.is_output_sol,
            input_account: if quote.is_input_sol {
                None
            } else {
                token_account.clone()
            },
            output_account: if quote.is_output_sol {
                None
            } else {
                token_account
            },
        };

        let serialized = self
            .raydium
            .build_swap_transactions(&request)
            .await
            .context("Failed to build swap transactions")?;

        let transactions = deserialize_transactions(&serialized, &quote.tx_version)?;
        info!("Deserialized {} transactions for submission", transactions.len());

        submit_batch(self.sender.as_ref(), &self.wallet, self.retry, transactions).await;
        Ok(())
    }
}

/// Decode the serialized batch per its declared format version.
fn deserialize_transactions(
    serialized: &[Vec<u8>],
    tx_version: &str,
) -> Result<Vec<VersionedTransaction>> {
    serialized
        .iter()
        .map(|bytes| {
            if tx_version == TX_VERSION_V0 {
                bincode::deserialize::<VersionedTransaction>(bytes)
                    .context("Failed to deserialize versioned transaction")
            } else {
                bincode::deserialize::<Transaction>(bytes)
                    .map(VersionedTransaction::from)
                    .context("Failed to deserialize legacy transaction")
            }
        })
        .collect()
}

/// Submit each transaction in order. Order matters: later transactions may
/// depend on earlier ones landing first (e.g. account creation before swap).
pub(crate) async fn submit_batch(
    sender: &dyn TransactionSender,
    wallet: &WalletManager,
    policy: RetryPolicy,
    transactions: Vec<VersionedTransaction>,
) {
    for (index, transaction) in transactions.into_iter().enumerate() {
        submit_one(sender, wallet, policy, index + 1, transaction).await;
    }
}

/// One transaction, up to `policy.max_attempts` submissions. Retrying a swap
/// is not idempotent, so after a confirmation timeout the ledger is asked for
/// the final status before the transaction is sent again. A signing failure
/// abandons the transaction without retrying: signing is local and
/// deterministic, so a second attempt cannot turn out differently.
async fn submit_one(
    sender: &dyn TransactionSender,
    wallet: &WalletManager,
    policy: RetryPolicy,
    index: usize,
    mut transaction: VersionedTransaction,
) {
    for attempt in 1..=policy.max_attempts {
        info!("Signing and sending transaction {} (attempt {})...", index, attempt);
        if let Err(e) = wallet.sign_versioned_transaction(&mut transaction) {
            error!("Failed to sign transaction {}: {}", index, e);
            return;
        }

        let signature = match sender.send_transaction(&transaction).await {
            Ok(signature) => signature,
            Err(e) => {
                if policy.is_final(attempt) {
                    error!(
                        "Transaction {} failed to send after {} attempts: {}",
                        index, policy.max_attempts, e
                    );
                    return;
                }
                warn!("Error sending transaction {} on attempt {}: {}", index, attempt, e);
                policy.wait().await;
                continue;
            }
        };
        info!("Transaction {} sent, signature: {}", index, signature);

        match sender.confirm_transaction(&signature, CONFIRM_TIMEOUT).await {
            Ok(()) => {
                info!("Transaction {} confirmed, signature: {}", index, signature);
                return;
            }
            Err(SniperError::ConfirmationTimeout) => {
                warn!(
                    "Transaction {} timed out on attempt {}, signature: {}",
                    index, attempt, signature
                );
                match sender.transaction_landed(&signature).await {
                    Ok(true) => {
                        info!(
                            "Transaction {} succeeded after timeout on attempt {}, signature: {}",
                            index, attempt, signature
                        );
                        return;
                    }
                    Ok(false) => {
                        warn!("Transaction {} shows no clean final status, will retry", index)
                    }
                    Err(e) => {
                        error!("Failed to fetch status for transaction {}: {}", index, e)
                    }
                }
            }
            Err(e) => {
                error!("Error with transaction {} on attempt {}: {}", index, attempt, e)
            }
        }

        if policy.is_final(attempt) {
            error!(
                "Transaction {} failed after {} attempts, signature: {}",
                index, policy.max_attempts, signature
            );
            return;
        }
        policy.wait().await;
    }
}
