use tracing::{debug, error, info, warn};

use crate::cache::token::Token;
use crate::cache::token_cache::TokenCache;
use crate::config::sources::{Settings, TaskSettings};
use crate::helpers::time::get_instant;
use crate::observability::metrics::{get_metrics, LABEL_FAILED, LABEL_FETCHED, LABEL_HIT, LABEL_MISS, LABEL_UNAVAILABLE};
use crate::sources::executor::{AcquireError, Acquisition, TokenBroker};
use crate::sources::sts::encode_claims;
use crate::sources::{PrimaryFetcher, SsoFetcher, StsExchanger};

static SOURCE_OAUTH2: &str = "oauth2";
static SOURCE_SSO: &str = "sso";
static SOURCE_STS: &str = "sts";

impl<C, P, S, X> TokenBroker<C, P, S, X>
where
    C: TokenCache + Sync,
    P: PrimaryFetcher + Sync,
    S: SsoFetcher + Sync,
    X: StsExchanger + Sync,
{
    /// Obtain a token for `settings`.
    ///
    /// Precedence: cache → (SSO | OAuth2) → optional STS → cache insert.
    /// Every failure is reported where it happens and ends the acquisition with no cache write.
    pub async fn acquire(&self, settings: &Settings, task_settings: &TaskSettings) -> Acquisition {
        let metrics = get_metrics().await;

        let acquisition = match self.lookup_cache(settings).await {
            Some(token) => Acquisition::Hit(token),
            None => match self.fetch_and_store(settings, task_settings).await {
                Ok(token) => Acquisition::Fetched(token),
                Err(e) => {
                    error!(stage = e.stage(), "{}", e);
                    metrics.acquisition_failures.with_label_values(&[e.stage()]).inc();
                    Acquisition::Failed(e)
                }
            },
        };

        let outcome = match &acquisition {
            Acquisition::Hit(_) => LABEL_HIT,
            Acquisition::Fetched(_) => LABEL_FETCHED,
            Acquisition::Failed(_) => LABEL_FAILED,
        };
        metrics.acquisitions.with_label_values(&[outcome]).inc();
        acquisition
    }

    /// Only a successful hit short-circuits; an unavailable cache counts as a miss.
    async fn lookup_cache(&self, settings: &Settings) -> Option<Token> {
        let metrics = get_metrics().await;
        match self.cache.lookup(settings).await {
            Ok(Some(token)) => {
                debug!("token cache hit");
                metrics.cache_lookups.with_label_values(&[LABEL_HIT]).inc();
                Some(token)
            }
            Ok(None) => {
                debug!("token cache miss");
                metrics.cache_lookups.with_label_values(&[LABEL_MISS]).inc();
                None
            }
            Err(e) => {
                warn!("token cache unavailable, fetching a fresh token: {:#}", e);
                metrics.cache_lookups.with_label_values(&[LABEL_UNAVAILABLE]).inc();
                None
            }
        }
    }

    async fn fetch_and_store(&self, settings: &Settings, task_settings: &TaskSettings) -> Result<Token, AcquireError> {
        let mut token = self.fetch(settings, task_settings).await?;

        if settings.sts {
            token = self.exchange(&token, settings).await?;
        }

        self.cache
            .insert(settings, &token)
            .await
            .map_err(AcquireError::CacheInsert)?;
        info!("token fetched and cached");
        Ok(token)
    }

    /// Exactly one path runs: SSO when there is an email but no credentials, OAuth2 otherwise.
    async fn fetch(&self, settings: &Settings, task_settings: &TaskSettings) -> Result<Token, AcquireError> {
        let start = get_instant();
        let (source, fetched) = match settings.email().filter(|_| settings.uses_sso()) {
            Some(email) => (
                SOURCE_SSO,
                self.sso
                    .fetch(&task_settings.sso_cli, email, settings.scope.trim())
                    .await
                    .map_err(AcquireError::Sso),
            ),
            None => (
                SOURCE_OAUTH2,
                self.primary.fetch(settings).await.map_err(AcquireError::Fetch),
            ),
        };
        observe_duration(source, start).await;
        fetched
    }

    async fn exchange(&self, token: &Token, settings: &Settings) -> Result<Token, AcquireError> {
        let start = get_instant();
        let exchanged = self
            .sts
            .exchange(&token.access_token, &encode_claims(settings))
            .await
            .map_err(AcquireError::Sts);
        observe_duration(SOURCE_STS, start).await;
        exchanged
    }
}

async fn observe_duration(source: &str, start: tokio::time::Instant) {
    get_metrics()
        .await
        .source_fetch_duration
        .with_label_values(&[source])
        .observe(start.elapsed().as_secs_f64());
}
