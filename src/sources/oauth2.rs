use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cache::token::Token;
use crate::config::sources::Settings;
use crate::helpers::time::now_i64;
use crate::sources::{read_token_response, PrimaryFetcher};
use crate::utils::constants::{
    CREDENTIALS_AUTHORIZED_USER, CREDENTIALS_SERVICE_ACCOUNT, DEFAULT_TOKEN_TYPE, GRANT_TYPE_JWT_BEARER,
    GRANT_TYPE_REFRESH_TOKEN, JWT_LIFETIME_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    pub token_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_uri: Option<String>,
}

/// Supported credential payloads, discriminated by their `type` field
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

impl Credentials {
    pub fn parse(credentials_json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(credentials_json).context("credentials are not valid JSON")?;
        let credentials_type = value.get("type").and_then(Value::as_str).unwrap_or_default().to_owned();
        match credentials_type.as_str() {
            CREDENTIALS_SERVICE_ACCOUNT => Ok(Credentials::ServiceAccount(
                serde_json::from_value(value).context("malformed service_account credentials")?,
            )),
            CREDENTIALS_AUTHORIZED_USER => Ok(Credentials::AuthorizedUser(
                serde_json::from_value(value).context("malformed authorized_user credentials")?,
            )),
            "" => Err(anyhow!("credentials have no 'type' field")),
            other => Err(anyhow!("unsupported credentials type '{}'", other)),
        }
    }
}

/// The `type` of the credential payload, empty when there is none or it cannot be read.
pub fn credential_type(settings: &Settings) -> String {
    settings
        .credentials()
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .and_then(|value| value.get("type").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// OAuth2 fetcher for service account and authorized user credentials.
#[derive(Debug, Clone)]
pub struct OAuth2Fetcher {
    client: Client,
    /// used when the credentials carry no `token_uri`
    token_url: String,
}

impl OAuth2Fetcher {
    pub fn new(client: Client, token_url: String) -> Self {
        Self { client, token_url }
    }

    async fn fetch_service_account(&self, key: &ServiceAccountKey, settings: &Settings) -> Result<Token> {
        if let Some(audience) = settings.audience() {
            debug!("minting self-signed JWT for audience '{}'", audience);
            return self_signed_jwt(key, audience);
        }

        let token_url = key.token_uri.as_deref().unwrap_or(&self.token_url);
        let iat = now_i64();
        let claims = AssertionClaims {
            iss: &key.client_email,
            sub: None,
            scope: Some(settings.scope.trim()),
            aud: token_url,
            iat,
            exp: iat + JWT_LIFETIME_SECS,
        };
        let assertion = sign(key, &claims)?;

        let mut form = HashMap::new();
        form.insert("grant_type", GRANT_TYPE_JWT_BEARER);
        form.insert("assertion", assertion.as_str());

        info!("fetching service account token for '{}'", key.client_email);
        let response = self.client.post(token_url).form(&form).send().await?;
        read_token_response(response, "OAuth2 token").await
    }

    async fn fetch_authorized_user(&self, user: &AuthorizedUser) -> Result<Token> {
        let token_url = user.token_uri.as_deref().unwrap_or(&self.token_url);

        let mut form = HashMap::new();
        form.insert("grant_type", GRANT_TYPE_REFRESH_TOKEN);
        form.insert("client_id", user.client_id.as_str());
        form.insert("client_secret", user.client_secret.as_str());
        form.insert("refresh_token", user.refresh_token.as_str());

        info!("refreshing authorized user token for client '{}'", user.client_id);
        let response = self.client.post(token_url).form(&form).send().await?;
        read_token_response(response, "OAuth2 token").await
    }
}

impl PrimaryFetcher for OAuth2Fetcher {
    async fn fetch(&self, settings: &Settings) -> Result<Token> {
        let credentials_json = settings
            .credentials()
            .ok_or_else(|| anyhow!("no credentials provided: pass a credentials file or an SSO email"))?;

        match Credentials::parse(credentials_json)? {
            Credentials::ServiceAccount(key) => self.fetch_service_account(&key, settings).await,
            Credentials::AuthorizedUser(user) => self.fetch_authorized_user(&user).await,
        }
    }
}

/// A JWT signed by the service account itself, usable directly as a bearer token.
fn self_signed_jwt(key: &ServiceAccountKey, audience: &str) -> Result<Token> {
    let iat = now_i64();
    let exp = iat + JWT_LIFETIME_SECS;
    let claims = AssertionClaims {
        iss: &key.client_email,
        sub: Some(&key.client_email),
        scope: None,
        aud: audience,
        iat,
        exp,
    };
    let jwt = sign(key, &claims)?;
    let raw = json!({
        "access_token": jwt,
        "token_type": DEFAULT_TOKEN_TYPE,
        "expires_in": JWT_LIFETIME_SECS,
    });
    Ok(Token::new(jwt, DEFAULT_TOKEN_TYPE.to_string(), Some(exp), raw))
}

fn sign(key: &ServiceAccountKey, claims: &AssertionClaims<'_>) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let encoding_key =
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).context("failed to parse service account private key")?;
    encode(&header, claims, &encoding_key).context("failed to sign JWT assertion")
}
