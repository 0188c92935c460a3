use anyhow::{anyhow, Result};
use http::StatusCode;
use reqwest::Client;
use tracing::{debug, info};

use crate::observability::metrics::{get_metrics, LABEL_INVALID, LABEL_VALID};

/// Remote token introspection (`tokeninfo`).
#[derive(Debug, Clone)]
pub struct TokenInfoClient {
    client: Client,
    /// the token is appended verbatim, e.g. `https://.../tokeninfo/?access_token=`
    base_url: String,
}

impl TokenInfoClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// The info payload of `token`; any status but 200 is an error whose message is the body.
    pub async fn info(&self, token: &str) -> Result<String> {
        let metrics = get_metrics().await;
        debug!("requesting token info");
        let response = self.client.get(format!("{}{}", self.base_url, token)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            info!("token info rejected the token: {}", status);
            metrics.token_info_requests.with_label_values(&[LABEL_INVALID]).inc();
            return Err(anyhow!(body));
        }
        metrics.token_info_requests.with_label_values(&[LABEL_VALID]).inc();
        Ok(body)
    }

    /// valid ⇔ `info` succeeds
    pub async fn test(&self, token: &str) -> bool {
        self.info(token).await.is_ok()
    }
}
