use anyhow::Result;
use tracing::info;

use crate::cache::token_cache::TokenCache;
use crate::observability::metrics::get_metrics;
use crate::sources::executor::TokenBroker;

impl<C, P, S, X> TokenBroker<C, P, S, X>
where
    C: TokenCache + Sync,
{
    /// Drop every cached token; the next acquisition of any settings fetches afresh.
    pub async fn reset(&self) -> Result<()> {
        self.cache.clear().await?;
        get_metrics().await.cache_clears.inc();
        info!("token cache cleared");
        Ok(())
    }
}
