use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tokio::process::Command;
use tracing::info;

use crate::cache::token::Token;
use crate::sources::SsoFetcher;
use crate::utils::constants::DEFAULT_TOKEN_TYPE;

/// Runs `<sso_cli> <email> <scope>` and takes its trimmed stdout as the access token.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsoCommand;

impl SsoFetcher for SsoCommand {
    async fn fetch(&self, sso_cli: &str, email: &str, scope: &str) -> Result<Token> {
        info!("fetching token for '{}' through '{}'", email, sso_cli);
        let output = Command::new(sso_cli)
            .arg(email)
            .arg(scope)
            .output()
            .await
            .with_context(|| format!("failed to run SSO command '{}'", sso_cli))?;

        if !output.status.success() {
            return Err(anyhow!(
                "SSO command '{}' failed ({}): {}",
                sso_cli,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let access_token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if access_token.is_empty() {
            return Err(anyhow!("SSO command '{}' returned no token", sso_cli));
        }

        let raw = json!({
            "access_token": access_token,
            "token_type": DEFAULT_TOKEN_TYPE,
        });
        Ok(Token::new(access_token, DEFAULT_TOKEN_TYPE.to_string(), None, raw))
    }
}
