//! Command tasks.
//!
//! Each task composes the broker with a formatter, validator or cache and writes
//! its user-facing output to `out`. Returned integers are process exit codes.

use std::io::Write;

use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::error;

use crate::cache::token_cache::{CacheStore, TokenCache};
use crate::config::sources::{BrokerConfig, Settings, TaskSettings};
use crate::endpoints::token_info::TokenInfoClient;
use crate::sinks::curl::curl_command;
use crate::sinks::output_format::{build_header, OutputFormat};
use crate::sources::executor::TokenBroker;
use crate::sources::oauth2::{credential_type, OAuth2Fetcher};
use crate::sources::sso::SsoCommand;
use crate::sources::sts::StsClient;
use crate::sources::{PrimaryFetcher, SsoFetcher, StsExchanger};

/// The broker wired with the production collaborators.
pub type Broker = TokenBroker<CacheStore, OAuth2Fetcher, SsoCommand, StsClient>;

pub fn build_broker(config: &BrokerConfig, client: &Client) -> Result<Broker> {
    let settings = &config.settings;
    Ok(TokenBroker::new(
        CacheStore::from_config(settings)?,
        OAuth2Fetcher::new(client.clone(), settings.endpoints.token_url.clone()),
        SsoCommand,
        StsClient::new(client.clone(), settings.endpoints.sts_url.clone()),
    ))
}

pub fn build_token_info_client(config: &BrokerConfig, client: &Client) -> TokenInfoClient {
    TokenInfoClient::new(client.clone(), config.settings.endpoints.token_info_url.clone())
}

/// Fetch a token and print it in the requested format.
///
/// The format is validated before anything is fetched; an unknown format is fatal.
pub async fn fetch<C, P, S, X>(
    broker: &TokenBroker<C, P, S, X>,
    settings: &Settings,
    task_settings: &TaskSettings,
    out: &mut impl Write,
) -> Result<i32>
where
    C: TokenCache + Sync,
    P: PrimaryFetcher + Sync,
    S: SsoFetcher + Sync,
    X: StsExchanger + Sync,
{
    let format: OutputFormat = task_settings.format.parse()?;
    let acquisition = broker.acquire(settings, task_settings).await;
    if let Some(rendered) = format.render(acquisition.as_token(), &credential_type(settings))? {
        writeln!(out, "{}", rendered)?;
    }
    Ok(0)
}

/// `fetch` with the format forced to `header`.
pub async fn header<C, P, S, X>(
    broker: &TokenBroker<C, P, S, X>,
    settings: &Settings,
    task_settings: &TaskSettings,
    out: &mut impl Write,
) -> Result<i32>
where
    C: TokenCache + Sync,
    P: PrimaryFetcher + Sync,
    S: SsoFetcher + Sync,
    X: StsExchanger + Sync,
{
    let task_settings = TaskSettings { format: OutputFormat::Header.to_string(), ..task_settings.clone() };
    fetch(broker, settings, &task_settings, out).await
}

/// Fetch a token and call `task_settings.url` through curl with it as the `Authorization` header.
pub async fn curl<C, P, S, X>(
    broker: &TokenBroker<C, P, S, X>,
    settings: &Settings,
    task_settings: &TaskSettings,
    out: &mut impl Write,
) -> Result<i32>
where
    C: TokenCache + Sync,
    P: PrimaryFetcher + Sync,
    S: SsoFetcher + Sync,
    X: StsExchanger + Sync,
{
    let url = task_settings
        .url
        .as_deref()
        .ok_or_else(|| anyhow!("curl requires a target url"))?;

    // a failed acquisition was already reported by the broker
    let Some(token) = broker.acquire(settings, task_settings).await.token() else {
        return Ok(0);
    };
    let header = build_header(&token.token_type, &token.access_token);
    let output = curl_command(&task_settings.curl_cli, &header, url, &task_settings.extra_args).await?;
    write!(out, "{}", output)?;
    Ok(0)
}

/// Print the token info, or the endpoint's error body.
pub async fn info(client: &TokenInfoClient, token: &str, out: &mut impl Write) -> Result<i32> {
    match client.info(token).await {
        Ok(info) => writeln!(out, "{}", info)?,
        Err(e) => write!(out, "{}", e)?,
    }
    Ok(0)
}

/// Print and return 0 for a valid token, 1 otherwise.
pub async fn test(client: &TokenInfoClient, token: &str, out: &mut impl Write) -> Result<i32> {
    let code = if client.test(token).await { 0 } else { 1 };
    writeln!(out, "{}", code)?;
    Ok(code)
}

/// Clear the token cache.
pub async fn reset<C, P, S, X>(broker: &TokenBroker<C, P, S, X>, out: &mut impl Write) -> Result<i32>
where
    C: TokenCache + Sync,
{
    if let Err(e) = broker.reset().await {
        error!("token cache reset failed: {:#}", e);
        writeln!(out, "{:#}", e)?;
    }
    Ok(0)
}
