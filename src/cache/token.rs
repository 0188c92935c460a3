use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::time::now_i64;

/// An access token as produced by any acquisition path.
///
/// `raw` is the provider response preserved verbatim for the `json` output formats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    /// UNIX TIMESTAMP, `None` when the provider did not say
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub raw: Value,
}

impl Token {
    pub fn new(access_token: String, token_type: String, expires_at: Option<i64>, raw: Value) -> Self {
        Self { access_token, token_type, expires_at, raw }
    }

    /// Tokens without an expiry never expire from the broker's point of view.
    pub fn is_expired(&self, safety_margin_seconds: u64) -> bool {
        self.expires_at
            .map(|exp| now_i64().saturating_add(safety_margin_seconds as i64) >= exp)
            .unwrap_or(false)
    }
}
