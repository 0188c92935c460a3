use std::collections::HashMap;

use anyhow::Result;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::info;

use crate::cache::token::Token;
use crate::config::sources::Settings;
use crate::sources::{read_token_response, StsExchanger};
use crate::utils::constants::{GRANT_TYPE_TOKEN_EXCHANGE, TOKEN_TYPE_ACCESS_TOKEN};

/// RFC 8693 token exchange client.
#[derive(Debug, Clone)]
pub struct StsClient {
    client: Client,
    sts_url: String,
}

impl StsClient {
    pub fn new(client: Client, sts_url: String) -> Self {
        Self { client, sts_url }
    }
}

impl StsExchanger for StsClient {
    async fn exchange(&self, access_token: &str, encoded_claims: &str) -> Result<Token> {
        let mut form = HashMap::new();
        form.insert("grant_type", GRANT_TYPE_TOKEN_EXCHANGE);
        form.insert("subject_token", access_token);
        form.insert("subject_token_type", TOKEN_TYPE_ACCESS_TOKEN);
        form.insert("requested_token_type", TOKEN_TYPE_ACCESS_TOKEN);
        if !encoded_claims.is_empty() {
            form.insert("options", encoded_claims);
        }

        info!("exchanging token at '{}'", self.sts_url);
        let response = self.client.post(&self.sts_url).form(&form).send().await?;
        read_token_response(response, "STS exchange").await
    }
}

/// Claims forwarded to STS in the `options` parameter, as compact JSON.
///
/// Empty when the settings request no claims.
pub fn encode_claims(settings: &Settings) -> String {
    let mut claims = Map::new();
    if let Some(audience) = settings.audience() {
        claims.insert("audience".to_string(), Value::String(audience.to_string()));
    }
    if let Some(project) = settings.quota_project() {
        claims.insert("userProject".to_string(), Value::String(project.to_string()));
    }
    if claims.is_empty() {
        return String::new();
    }
    Value::Object(claims).to_string()
}
