use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::dexscreener::{DexScreenerClient, TARGET_CHAIN};
use crate::models::token::TokenCandidate;
use crate::trading::validator::TokenValidator;

/// Polls the profiles feed once and returns the first candidate on the target
/// chain that clears validation. No retry here; the orchestrator owns backoff.
pub struct Discovery {
    dexscreener: Arc<DexScreenerClient>,
    validator: TokenValidator,
}

impl Discovery {
    pub fn new(dexscreener: Arc<DexScreenerClient>, validator: TokenValidator) -> Self {
        Self {
            dexscreener,
            validator,
        }
    }

    pub async fn find_candidate(&self) -> Option<TokenCandidate> {
        let profiles = match self.dexscreener.latest_token_profiles().await {
            Ok(profiles) => profiles,
            Err(e) => {
                error!("Error fetching latest tokens from DexScreener: {}", e);
                return None;
            }
        };

        for candidate in profiles {
            if candidate.chain_id != TARGET_CHAIN {
                continue;
            }
            debug!("Evaluating candidate {} ({})", candidate.label(), candidate.token_address);
            if self.validator.validate(&candidate).await {
                info!("Token {} passed all checks", candidate.token_address);
                return Some(candidate);
            }
            info!(
                "Token {} did not meet the criteria. Skipping.",
                candidate.token_address
            );
        }

        error!("No valid {} token found in this feed poll", TARGET_CHAIN);
        None
    }
}
