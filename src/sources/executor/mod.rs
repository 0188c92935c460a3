//! Credential acquisition.
//!
//! `TokenBroker` sequences cache, SSO delegate, OAuth2 fetcher and STS exchanger:
//! - cache hit short-circuits everything
//! - on a miss exactly one of SSO / OAuth2 runs
//! - STS runs at most once, and only on a fresh token
//! - a fresh token is returned only after it was cached

use thiserror::Error;

use crate::cache::token::Token;

pub mod token_fetch;
pub mod token_invalidate;

/// Why an acquisition produced no token.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("SSO fetch failed: {0:#}")]
    Sso(anyhow::Error),
    #[error("token fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error("STS exchange failed: {0:#}")]
    Sts(anyhow::Error),
    #[error("token cache insert failed: {0:#}")]
    CacheInsert(anyhow::Error),
}

impl AcquireError {
    /// metrics / log label of the failing step
    pub fn stage(&self) -> &'static str {
        match self {
            AcquireError::Sso(_) => "sso",
            AcquireError::Fetch(_) => "fetch",
            AcquireError::Sts(_) => "sts",
            AcquireError::CacheInsert(_) => "cache_insert",
        }
    }
}

/// Outcome of `TokenBroker::acquire`.
#[derive(Debug)]
pub enum Acquisition {
    /// served from cache, nothing else ran
    Hit(Token),
    /// fetched (and exchanged if requested) then cached
    Fetched(Token),
    Failed(AcquireError),
}

impl Acquisition {
    pub fn token(self) -> Option<Token> {
        match self {
            Acquisition::Hit(token) | Acquisition::Fetched(token) => Some(token),
            Acquisition::Failed(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Acquisition::Hit(token) | Acquisition::Fetched(token) => Some(token),
            Acquisition::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Token, AcquireError> {
        match self {
            Acquisition::Hit(token) | Acquisition::Fetched(token) => Ok(token),
            Acquisition::Failed(e) => Err(e),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Acquisition::Hit(_))
    }
}

/// Holds the injected collaborators. One instance per process is expected.
#[derive(Debug, Clone)]
pub struct TokenBroker<C, P, S, X> {
    pub(crate) cache: C,
    pub(crate) primary: P,
    pub(crate) sso: S,
    pub(crate) sts: X,
}

impl<C, P, S, X> TokenBroker<C, P, S, X> {
    pub fn new(cache: C, primary: P, sso: S, sts: X) -> Self {
        Self { cache, primary, sso, sts }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}
