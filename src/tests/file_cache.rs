use serde_json::json;
use tempfile::TempDir;

use crate::cache::token::Token;
use crate::cache::token_cache::{CacheStore, FileTokenCache, TokenCache};
use crate::config::settings::SettingsConfig;
use crate::config::sources::Settings;
use crate::helpers::time::now_i64;
use crate::tests::common::{credential_settings, token};

fn file_cache(dir: &TempDir) -> FileTokenCache {
    FileTokenCache::new(dir.path().join("nested").join("cache.json"), 10)
}

#[tokio::test]
async fn missing_file_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);

    assert_eq!(cache.lookup(&credential_settings()).await.unwrap(), None);
}

#[tokio::test]
async fn inserted_token_is_found_under_the_same_settings_only() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let settings = credential_settings();

    cache.insert(&settings, &token("cached")).await.unwrap();

    assert_eq!(cache.lookup(&settings).await.unwrap(), Some(token("cached")));
    let other = Settings { scope: "openid".to_string(), ..settings.clone() };
    assert_eq!(cache.lookup(&other).await.unwrap(), None);
    let exchanged = Settings { sts: true, ..settings };
    assert_eq!(cache.lookup(&exchanged).await.unwrap(), None);
}

#[tokio::test]
async fn token_inside_safety_margin_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let settings = credential_settings();
    let expiring = Token::new("expiring".into(), "Bearer".into(), Some(now_i64() + 5), json!({}));

    cache.insert(&settings, &expiring).await.unwrap();

    assert_eq!(cache.lookup(&settings).await.unwrap(), None);
}

#[tokio::test]
async fn corrupted_file_fails_lookup_but_insert_recovers() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let settings = credential_settings();
    tokio::fs::create_dir_all(cache.path().parent().unwrap()).await.unwrap();
    tokio::fs::write(cache.path(), "{not json").await.unwrap();

    assert!(cache.lookup(&settings).await.is_err());

    cache.insert(&settings, &token("fresh")).await.unwrap();
    assert_eq!(cache.lookup(&settings).await.unwrap(), Some(token("fresh")));
}

#[tokio::test]
async fn clear_removes_everything_and_tolerates_missing_file() {
    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    let settings = credential_settings();

    cache.clear().await.unwrap();

    cache.insert(&settings, &token("cached")).await.unwrap();
    cache.clear().await.unwrap();
    assert!(!cache.path().exists());
    assert_eq!(cache.lookup(&settings).await.unwrap(), None);
}

#[cfg(unix)]
#[tokio::test]
async fn cache_file_is_private_to_the_user() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let cache = file_cache(&dir);
    cache.insert(&credential_settings(), &token("cached")).await.unwrap();

    let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn disabled_cache_config_yields_memory_store() {
    let mut config = SettingsConfig::default();
    config.cache.is_enabled = false;
    assert!(matches!(CacheStore::from_config(&config).unwrap(), CacheStore::Memory(_)));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    config.cache.is_enabled = true;
    config.cache.path = Some(path.to_string_lossy().into_owned());
    match CacheStore::from_config(&config).unwrap() {
        CacheStore::File(cache) => assert_eq!(cache.path(), path.as_path()),
        other => panic!("expected a file cache, got {:?}", other),
    }
}
