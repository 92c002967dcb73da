use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::dexscreener::{DexScreenerClient, TokenPair, TARGET_DEX};
use crate::api::rugcheck::RugCheckClient;
use crate::config::ValidationThresholds;
use crate::models::token::TokenCandidate;

/// Applies the fixed buy checklist to a discovered token. Every gate is hard:
/// the first failure rejects the candidate. Fetch errors reject too (fail
/// closed), with the single exception of the risk report, whose absence is
/// tolerated.
pub struct TokenValidator {
    dexscreener: Arc<DexScreenerClient>,
    rugcheck: Arc<RugCheckClient>,
    thresholds: ValidationThresholds,
}

impl TokenValidator {
    pub fn new(
        dexscreener: Arc<DexScreenerClient>,
        rugcheck: Arc<RugCheckClient>,
        thresholds: ValidationThresholds,
    ) -> Self {
        Self {
            dexscreener,
            rugcheck,
            thresholds,
        }
    }

    pub async fn validate(&self, candidate: &TokenCandidate) -> bool {
        let address = &candidate.token_address;

        // Pair data and risk report fetched in parallel; only the pair fetch
        // is load-bearing.
        let (pairs_result, risk_result) = tokio::join!(
            self.dexscreener.token_pairs(address),
            self.rugcheck.risk_score(address),
        );

        let pairs = match pairs_result {
            Ok(pairs) => pairs,
            Err(e) => {
                error!("Error fetching pairs for token {}: {}", address, e);
                return false;
            }
        };

        let risk_score = match risk_result {
            Ok(score) => score,
            Err(e) => {
                warn!("RugCheck unavailable for token {}: {}", address, e);
                None
            }
        };

        let Some(pair) = pairs.iter().find(|p| p.dex_id == TARGET_DEX) else {
            warn!("No {} pair found for token {}", TARGET_DEX, address);
            return false;
        };

        let passed = passes_gates(
            pair,
            risk_score,
            &self.thresholds,
            Utc::now().timestamp_millis(),
            address,
        );
        if passed {
            info!("Token {} passed validation", address);
        }
        passed
    }
}

/// The checklist itself, separated from I/O so the gates are testable.
fn passes_gates(
    pair: &TokenPair,
    risk_score: Option<f64>,
    thresholds: &ValidationThresholds,
    now_ms: i64,
    address: &str,
) -> bool {
    let Some(age_minutes) = pair.age_minutes(now_ms) else {
        warn!("Token {} has no pair creation time. Skipping.", address);
        return false;
    };
    if age_minutes < thresholds.min_age_minutes {
        warn!(
            "Token {} is too new ({:.1} < {} min). Skipping.",
            address, age_minutes, thresholds.min_age_minutes
        );
        return false;
    }
    if age_minutes > thresholds.max_age_minutes {
        warn!(
            "Token {} is too old ({:.1} > {} min). Skipping.",
            address, age_minutes, thresholds.max_age_minutes
        );
        return false;
    }

    let liquidity = pair.liquidity_usd();
    if liquidity < thresholds.min_liquidity_usd {
        warn!(
            "Token {} has insufficient liquidity (${:.2}). Skipping.",
            address, liquidity
        );
        return false;
    }

    let market_cap = pair.market_cap_usd();
    let fdv = pair.fdv_usd();
    if market_cap < thresholds.min_market_cap_usd {
        warn!("Token {} fails market cap validation. Skipping.", address);
        return false;
    }
    // fdv of zero fails the ratio gate rather than dividing by it
    if fdv <= 0.0 || market_cap / fdv < thresholds.min_mcap_fdv_ratio {
        warn!("Token {} fails market cap / FDV ratio validation. Skipping.", address);
        return false;
    }

    // Risk gate only applies when a score was actually obtained
    if let Some(score) = risk_score {
        if score > thresholds.max_risk_score {
            warn!("Token {} has a high risk score ({}). Skipping.", address, score);
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dexscreener::PairLiquidity;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn good_pair() -> TokenPair {
        TokenPair {
            chain_id: "solana".to_string(),
            dex_id: TARGET_DEX.to_string(),
            // 30 minutes old at NOW_MS
            pair_created_at: Some(NOW_MS - 30 * 60_000),
            price_usd: Some("0.001".to_string()),
            liquidity: Some(PairLiquidity { usd: Some(5_000.0) }),
            market_cap: Some(50_000.0),
            fdv: Some(60_000.0),
        }
    }

    fn thresholds() -> ValidationThresholds {
        ValidationThresholds::default()
    }

    #[test]
    fn test_all_gates_pass() {
        assert!(passes_gates(&good_pair(), None, &thresholds(), NOW_MS, "t"));
        assert!(passes_gates(&good_pair(), Some(0.5), &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_too_new_fails() {
        let mut pair = good_pair();
        pair.pair_created_at = Some(NOW_MS - 5 * 60_000);
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_too_old_fails() {
        let mut pair = good_pair();
        pair.pair_created_at = Some(NOW_MS - 7_000 * 60_000);
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_missing_creation_time_fails() {
        let mut pair = good_pair();
        pair.pair_created_at = None;
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_low_liquidity_fails() {
        let mut pair = good_pair();
        pair.liquidity = Some(PairLiquidity { usd: Some(50.0) });
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_mcap_fdv_ratio_fails_even_when_all_else_passes() {
        let mut pair = good_pair();
        pair.market_cap = Some(10_000.0);
        pair.fdv = Some(100_000.0); // ratio 0.1 < 0.5
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_zero_fdv_fails_ratio_gate_without_dividing() {
        let mut pair = good_pair();
        pair.fdv = Some(0.0);
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
        pair.fdv = None;
        assert!(!passes_gates(&pair, None, &thresholds(), NOW_MS, "t"));
    }

    #[test]
    fn test_missing_risk_score_is_not_a_failure() {
        // identical pair passes with no score but fails with a high one
        assert!(passes_gates(&good_pair(), None, &thresholds(), NOW_MS, "t"));
        assert!(!passes_gates(&good_pair(), Some(5.0), &thresholds(), NOW_MS, "t"));
    }

    #[tokio::test]
    async fn test_validate_fails_closed_on_pair_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _pairs = server
            .mock("GET", "/latest/dex/tokens/MintA")
            .with_status(500)
            .create_async()
            .await;
        let _risk = server
            .mock("GET", "/v1/tokens/MintA/report/summary")
            .with_status(200)
            .with_body(r#"{"score": 0.0}"#)
            .create_async()
            .await;

        let validator = TokenValidator::new(
            Arc::new(DexScreenerClient::with_base_url(server.url())),
            Arc::new(RugCheckClient::with_base_url(server.url())),
            thresholds(),
        );
        let candidate = TokenCandidate {
            chain_id: "solana".to_string(),
            token_address: "MintA".to_string(),
            name: None,
            symbol: None,
        };
        assert!(!validator.validate(&candidate).await);
    }
}
