use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::cache_key::cache_key;
use crate::cache::token::Token;
use crate::config::settings::SettingsConfig;
use crate::config::sources::Settings;
use crate::utils::config_loader::broker_home;
use crate::utils::constants::{CACHE_FILE_NAME, DEFAULT_SAFETY_MARGIN_SECS};

/// Keyed store of previously obtained tokens.
///
/// `lookup` returning `Ok(None)` is a miss, `Err` means the cache itself is unavailable.
pub trait TokenCache {
    fn lookup(&self, settings: &Settings) -> impl Future<Output = Result<Option<Token>>> + Send;
    fn insert(&self, settings: &Settings, token: &Token) -> impl Future<Output = Result<()>> + Send;
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

/// ================================
/// File cache
/// ================================
/// All tokens live in a single JSON object keyed by `cache_key`.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
    safety_margin_seconds: u64,
}

impl FileTokenCache {
    pub fn new(path: PathBuf, safety_margin_seconds: u64) -> Self {
        Self { path, safety_margin_seconds }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Result<BTreeMap<String, Token>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("token cache '{}' is corrupted", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read token cache '{}'", self.path.display())),
        }
    }

    /// Replace the cache file via rename so readers never see a partial write.
    async fn write_entries(&self, entries: &BTreeMap<String, Token>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create cache dir '{}'", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("failed to write token cache '{}'", tmp.display()))?;
        restrict_permissions(&tmp).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to move token cache into '{}'", self.path.display()))
    }
}

impl TokenCache for FileTokenCache {
    async fn lookup(&self, settings: &Settings) -> Result<Option<Token>> {
        let key = cache_key(settings);
        let entries = self.read_entries().await?;
        let token = entries.get(&key).cloned().filter(|token| {
            let expired = token.is_expired(self.safety_margin_seconds);
            if expired {
                debug!("cached token '{}' expired", key);
            }
            !expired
        });
        Ok(token)
    }

    async fn insert(&self, settings: &Settings, token: &Token) -> Result<()> {
        let mut entries = match self.read_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("discarding unreadable token cache: {:#}", e);
                BTreeMap::new()
            }
        };
        entries.retain(|_, cached| !cached.is_expired(0));
        entries.insert(cache_key(settings), token.clone());
        self.write_entries(&entries).await?;
        debug!("token cache '{}' holds {} entries", self.path.display(), entries.len());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("token cache '{}' removed", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove token cache '{}'", self.path.display())),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .with_context(|| format!("failed to restrict permissions of '{}'", path.display()))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// ================================
/// Memory cache
/// ================================
/// Process-local cache, safe for concurrent lookup/insert.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenCache {
    inner: Arc<RwLock<HashMap<String, Token>>>,
    safety_margin_seconds: u64,
}

impl MemoryTokenCache {
    pub fn new(safety_margin_seconds: u64) -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())), safety_margin_seconds }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl TokenCache for MemoryTokenCache {
    async fn lookup(&self, settings: &Settings) -> Result<Option<Token>> {
        let map = self.inner.read().await;
        Ok(map
            .get(&cache_key(settings))
            .filter(|token| !token.is_expired(self.safety_margin_seconds))
            .cloned())
    }

    async fn insert(&self, settings: &Settings, token: &Token) -> Result<()> {
        let mut map = self.inner.write().await;
        map.insert(cache_key(settings), token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.inner.write().await.clear();
        Ok(())
    }
}

/// ================================
/// Configured cache
/// ================================
#[derive(Debug, Clone)]
pub enum CacheStore {
    File(FileTokenCache),
    Memory(MemoryTokenCache),
}

impl CacheStore {
    /// Open the cache described by config; disabled caching still dedupes within the process.
    pub fn from_config(settings: &SettingsConfig) -> Result<Self> {
        let safety_margin = settings.safety_margin_seconds.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS);
        if !settings.cache.is_enabled {
            info!("token cache disabled, using in-memory cache");
            return Ok(CacheStore::Memory(MemoryTokenCache::new(safety_margin)));
        }
        let path = match &settings.cache.path {
            Some(path) => PathBuf::from(path),
            None => broker_home()
                .map(|home| home.join(CACHE_FILE_NAME))
                .context("Could not determine home directory for the token cache")?,
        };
        debug!("token cache at '{}'", path.display());
        Ok(CacheStore::File(FileTokenCache::new(path, safety_margin)))
    }
}

impl TokenCache for CacheStore {
    async fn lookup(&self, settings: &Settings) -> Result<Option<Token>> {
        match self {
            CacheStore::File(c) => c.lookup(settings).await,
            CacheStore::Memory(c) => c.lookup(settings).await,
        }
    }

    async fn insert(&self, settings: &Settings, token: &Token) -> Result<()> {
        match self {
            CacheStore::File(c) => c.insert(settings, token).await,
            CacheStore::Memory(c) => c.insert(settings, token).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            CacheStore::File(c) => c.clear().await,
            CacheStore::Memory(c) => c.clear().await,
        }
    }
}
