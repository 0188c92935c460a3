// tests/common/mod.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use serde_json::json;

use crate::cache::token::Token;
use crate::cache::token_cache::{MemoryTokenCache, TokenCache};
use crate::config::sources::{Settings, TaskSettings};
use crate::sources::executor::TokenBroker;
use crate::sources::{PrimaryFetcher, SsoFetcher, StsExchanger};

pub const SERVICE_ACCOUNT_KEY_PEM: &str = include_str!("../data/service_account_key.pem");
pub const SERVICE_ACCOUNT_PUB_PEM: &str = include_str!("../data/service_account_pub.pem");

pub fn token(access_token: &str) -> Token {
    Token::new(
        access_token.to_string(),
        "Bearer".to_string(),
        None,
        json!({"access_token": access_token, "token_type": "Bearer"}),
    )
}

pub fn credential_settings() -> Settings {
    Settings {
        credentials_json: Some(
            r#"{"type":"authorized_user","client_id":"id","client_secret":"secret","refresh_token":"rt"}"#.to_string(),
        ),
        scope: "https://www.googleapis.com/auth/cloud-platform".to_string(),
        ..Default::default()
    }
}

pub fn sso_settings() -> Settings {
    Settings {
        email: Some("user@example.com".to_string()),
        scope: "openid".to_string(),
        ..Default::default()
    }
}

pub fn task_settings() -> TaskSettings {
    TaskSettings {
        format: "bare".to_string(),
        sso_cli: "/opt/sso".to_string(),
        curl_cli: "curl".to_string(),
        url: None,
        extra_args: Vec::new(),
    }
}

/// Memory cache with call counters and injectable failures
#[derive(Default)]
pub struct RecordingCache {
    pub inner: MemoryTokenCache,
    pub fail_lookup: bool,
    pub fail_insert: bool,
    pub lookups: AtomicUsize,
    pub inserted: Mutex<Vec<Token>>,
}

impl RecordingCache {
    pub fn failing_lookup() -> Self {
        Self { fail_lookup: true, ..Default::default() }
    }

    pub fn failing_insert() -> Self {
        Self { fail_insert: true, ..Default::default() }
    }

    pub fn inserted(&self) -> Vec<Token> {
        self.inserted.lock().unwrap().clone()
    }
}

impl TokenCache for RecordingCache {
    async fn lookup(&self, settings: &Settings) -> Result<Option<Token>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            return Err(anyhow!("cache file is locked"));
        }
        self.inner.lookup(settings).await
    }

    async fn insert(&self, settings: &Settings, token: &Token) -> Result<()> {
        self.inserted.lock().unwrap().push(token.clone());
        if self.fail_insert {
            return Err(anyhow!("disk full"));
        }
        self.inner.insert(settings, token).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Returns `token` or fails when it is `None`
#[derive(Default)]
pub struct FakePrimary {
    pub token: Option<Token>,
    pub calls: AtomicUsize,
}

impl FakePrimary {
    pub fn returning(access_token: &str) -> Self {
        Self { token: Some(token(access_token)), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PrimaryFetcher for FakePrimary {
    async fn fetch(&self, _settings: &Settings) -> Result<Token> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.clone().ok_or_else(|| anyhow!("invalid_grant"))
    }
}

#[derive(Default)]
pub struct FakeSso {
    pub token: Option<Token>,
    pub args: Mutex<Vec<(String, String, String)>>,
}

impl FakeSso {
    pub fn returning(access_token: &str) -> Self {
        Self { token: Some(token(access_token)), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.args.lock().unwrap().len()
    }
}

impl SsoFetcher for FakeSso {
    async fn fetch(&self, sso_cli: &str, email: &str, scope: &str) -> Result<Token> {
        self.args
            .lock()
            .unwrap()
            .push((sso_cli.to_string(), email.to_string(), scope.to_string()));
        self.token.clone().ok_or_else(|| anyhow!("sso helper exited with 1"))
    }
}

#[derive(Default)]
pub struct FakeSts {
    pub token: Option<Token>,
    pub args: Mutex<Vec<(String, String)>>,
}

impl FakeSts {
    pub fn returning(access_token: &str) -> Self {
        Self { token: Some(token(access_token)), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.args.lock().unwrap().len()
    }
}

impl StsExchanger for FakeSts {
    async fn exchange(&self, access_token: &str, encoded_claims: &str) -> Result<Token> {
        self.args
            .lock()
            .unwrap()
            .push((access_token.to_string(), encoded_claims.to_string()));
        self.token.clone().ok_or_else(|| anyhow!("sts returned 400"))
    }
}

pub type FakeBroker = TokenBroker<RecordingCache, FakePrimary, FakeSso, FakeSts>;

pub fn broker(cache: RecordingCache, primary: FakePrimary, sso: FakeSso, sts: FakeSts) -> FakeBroker {
    TokenBroker::new(cache, primary, sso, sts)
}
