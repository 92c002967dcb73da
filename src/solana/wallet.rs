use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::error::SniperError;

/// Holds the process-wide signing key. Loaded once at startup; every
/// transaction the bot submits is signed with this keypair.
#[derive(Clone)]
pub struct WalletManager {
    keypair: Arc<Keypair>,
}

impl WalletManager {
    pub fn new(private_key_bs58: &str) -> Result<Arc<Self>, SniperError> {
        let bytes = bs58::decode(private_key_bs58).into_vec().map_err(|e| {
            error!("Failed to decode base58 private key: {}", e);
            SniperError::Wallet(format!("Invalid private key format: {}", e))
        })?;

        let keypair = Keypair::from_bytes(&bytes).map_err(|e| {
            error!("Failed to create keypair from bytes: {}", e);
            SniperError::Wallet(format!("Invalid private key data: {}", e))
        })?;

        info!("Wallet initialized. Pubkey: {}", keypair.pubkey());
        Ok(Arc::new(Self {
            keypair: Arc::new(keypair),
        }))
    }

    #[cfg(test)]
    pub fn from_keypair(keypair: Keypair) -> Arc<Self> {
        Arc::new(Self {
            keypair: Arc::new(keypair),
        })
    }

    pub fn public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Signs the transaction in place as the fee payer. The trade API builds
    /// transactions with the recent blockhash already set, so the message is
    /// signed as received.
    pub fn sign_versioned_transaction(
        &self,
        transaction: &mut VersionedTransaction,
    ) -> Result<(), SniperError> {
        let message_bytes = transaction.message.serialize();
        let signature = self
            .keypair
            .try_sign_message(&message_bytes)
            .map_err(|e| SniperError::Wallet(format!("Signing failed: {}", e)))?;

        if transaction.signatures.is_empty() {
            return Err(SniperError::Wallet(
                "Transaction has no signature slots".to_string(),
            ));
        }
        transaction.signatures[0] = signature;
        Ok(())
    }
}
