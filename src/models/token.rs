use serde::{Deserialize, Serialize};

/// A token surfaced by the DexScreener profiles feed. Immutable once fetched.
/// The feed does not always carry name/symbol, so both are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCandidate {
    pub chain_id: String,
    pub token_address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl TokenCandidate {
    /// Display label for logs: symbol if known, address otherwise.
    pub fn label(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.token_address)
    }
}

/// The single open position the bot is allowed to hold. `Some` only after a
/// buy pipeline run completed without error; cleared when the sell lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub token_address: String,
    /// Output amount reported by the buy quote, in the token's base units.
    pub output_amount_lamports: u64,
}
