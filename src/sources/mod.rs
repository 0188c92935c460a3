//! Sources module
//!
//! The acquisition paths a token can come from, each behind a trait so the
//! broker can be driven by fakes in tests.

use std::future::Future;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::token::Token;
use crate::config::sources::Settings;
use crate::helpers::time::expires_at_from_now;
use crate::utils::constants::DEFAULT_TOKEN_TYPE;

pub mod executor;
pub mod oauth2;
pub mod sso;
pub mod sts;

/// Standard OAuth2 flow against the configured credentials and scope.
pub trait PrimaryFetcher {
    fn fetch(&self, settings: &Settings) -> impl Future<Output = Result<Token>> + Send;
}

/// Interactive / human identity flow delegated to an external command.
pub trait SsoFetcher {
    fn fetch(&self, sso_cli: &str, email: &str, scope: &str) -> impl Future<Output = Result<Token>> + Send;
}

/// Security Token Service exchange. Called at most once per acquisition.
pub trait StsExchanger {
    fn exchange(&self, access_token: &str, encoded_claims: &str) -> impl Future<Output = Result<Token>> + Send;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: Option<String>,
    expires_in: Option<i64>,
}

/// Parse an OAuth2 token endpoint response body, keeping the full payload as `raw`.
pub fn parse_token_response(body: &str) -> Result<Token> {
    let raw: Value = serde_json::from_str(body).context("token response is not valid JSON")?;
    let response: TokenResponse =
        serde_json::from_value(raw.clone()).context("token response is missing 'access_token'")?;
    if response.access_token.trim().is_empty() {
        return Err(anyhow!("token response has an empty 'access_token'"));
    }

    Ok(Token::new(
        response.access_token,
        response
            .token_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
        response.expires_in.map(expires_at_from_now),
        raw,
    ))
}

/// Read a token endpoint response; non-2xx statuses become errors carrying the body.
pub async fn read_token_response(response: reqwest::Response, endpoint: &str) -> Result<Token> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(anyhow!("{} request failed: {}: {}", endpoint, status, body));
    }
    parse_token_response(&body)
}
