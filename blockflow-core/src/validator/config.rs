//! Validator settings — whitelists and strict mode.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKENS: [&str; 8] = ["TON", "USDT", "USDC", "NOT", "STON", "jUSDT", "BTC", "ETH"];
pub const DEFAULT_PROTOCOLS: [&str; 5] = ["stonfi", "dedust", "tonstakers", "bemo", "evaa"];

/// Comparison operators accepted by condition blocks.
pub const CONDITION_OPERATORS: [&str; 8] =
    [">", "<", ">=", "<=", "==", "!=", "crosses_above", "crosses_below"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ValidatorConfig {
    pub token_whitelist: Vec<String>,
    pub protocol_whitelist: Vec<String>,
    /// When set, any warning also makes the strategy invalid.
    pub strict: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            token_whitelist: DEFAULT_TOKENS.iter().map(|s| s.to_string()).collect(),
            protocol_whitelist: DEFAULT_PROTOCOLS.iter().map(|s| s.to_string()).collect(),
            strict: false,
        }
    }
}

impl ValidatorConfig {
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn token_allowed(&self, token: &str) -> bool {
        self.token_whitelist
            .iter()
            .any(|t| t.eq_ignore_ascii_case(token))
    }

    pub fn protocol_allowed(&self, protocol: &str) -> bool {
        self.protocol_whitelist
            .iter()
            .any(|p| p.eq_ignore_ascii_case(protocol))
    }
}
