use thiserror::Error;

#[derive(Debug, Error)]
pub enum SniperError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Solana RPC error: {0}")]
    Solana(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Transaction confirmation timed out")]
    ConfirmationTimeout,

    #[error("Transaction failed on chain: {0}")]
    TransactionFailed(String),

    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SniperError {
    /// Whether a retry with backoff can reasonably be expected to succeed.
    /// Callers branch on this instead of inspecting error messages.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SniperError::Api(_) | SniperError::Solana(_) | SniperError::ConfirmationTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SniperError::Api("503".to_string()).is_transient());
        assert!(SniperError::ConfirmationTimeout.is_transient());
        assert!(!SniperError::InsufficientBalance("0 tokens".to_string()).is_transient());
        assert!(!SniperError::TransactionFailed("custom program error".to_string()).is_transient());
    }
}
