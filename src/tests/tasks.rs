use httpmock::prelude::*;
use reqwest::Client;
use serde_json::json;

use crate::cache::token_cache::TokenCache;
use crate::config::sources::TaskSettings;
use crate::endpoints::token_info::TokenInfoClient;
use crate::tasks;
use crate::tests::common::*;

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn header_prints_authorization_line() {
    let broker = broker(RecordingCache::default(), FakePrimary::returning("T"), FakeSso::default(), FakeSts::default());
    let mut out = Vec::new();

    let code = tasks::header(&broker, &credential_settings(), &task_settings(), &mut out).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(output(out), "Authorization: Bearer T\n");
}

#[tokio::test]
async fn fetch_prints_pretty_credential_type() {
    let broker = broker(RecordingCache::default(), FakePrimary::returning("T"), FakeSso::default(), FakeSts::default());
    let task_settings = TaskSettings { format: "pretty".to_string(), ..task_settings() };
    let mut out = Vec::new();

    tasks::fetch(&broker, &credential_settings(), &task_settings, &mut out).await.unwrap();

    assert_eq!(output(out), "Fetched credentials of type:\n  authorized_user\nAccess Token:\n  T\n");
}

#[tokio::test]
async fn unknown_format_fails_before_fetching() {
    let broker = broker(RecordingCache::default(), FakePrimary::returning("T"), FakeSso::default(), FakeSts::default());
    let task_settings = TaskSettings { format: "yaml".to_string(), ..task_settings() };
    let mut out = Vec::new();

    let err = tasks::fetch(&broker, &credential_settings(), &task_settings, &mut out).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid choice: 'yaml' (choose from 'bare', 'header', 'json', 'json_compact', 'pretty')"
    );
    assert_eq!(broker.primary.calls(), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn failed_acquisition_prints_nothing() {
    let broker = broker(RecordingCache::default(), FakePrimary::default(), FakeSso::default(), FakeSts::default());
    let mut out = Vec::new();

    let code = tasks::fetch(&broker, &credential_settings(), &task_settings(), &mut out).await.unwrap();

    assert_eq!(code, 0);
    assert!(out.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn curl_passes_the_token_header() {
    let broker = broker(RecordingCache::default(), FakePrimary::returning("T"), FakeSso::default(), FakeSts::default());
    let task_settings = TaskSettings {
        curl_cli: "echo".to_string(),
        url: Some("https://example.com/v1/things".to_string()),
        extra_args: vec!["-s".to_string()],
        ..task_settings()
    };
    let mut out = Vec::new();

    tasks::curl(&broker, &credential_settings(), &task_settings, &mut out).await.unwrap();

    assert_eq!(output(out), "-H Authorization: Bearer T https://example.com/v1/things -s\n");
}

#[tokio::test]
async fn curl_requires_a_url() {
    let broker = broker(RecordingCache::default(), FakePrimary::returning("T"), FakeSso::default(), FakeSts::default());
    let mut out = Vec::new();

    assert!(tasks::curl(&broker, &credential_settings(), &task_settings(), &mut out).await.is_err());
}

#[tokio::test]
async fn test_prints_and_returns_validity() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/tokeninfo").query_param("access_token", "good");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"scope": "openid"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/tokeninfo").query_param("access_token", "bad");
            then.status(400).body("invalid_token");
        })
        .await;
    let client = TokenInfoClient::new(Client::new(), server.url("/tokeninfo?access_token="));

    let mut out = Vec::new();
    assert_eq!(tasks::test(&client, "good", &mut out).await.unwrap(), 0);
    assert_eq!(output(out), "0\n");

    let mut out = Vec::new();
    assert_eq!(tasks::test(&client, "bad", &mut out).await.unwrap(), 1);
    assert_eq!(output(out), "1\n");

    let mut out = Vec::new();
    assert_eq!(tasks::info(&client, "bad", &mut out).await.unwrap(), 0);
    assert_eq!(output(out), "invalid_token");
}

#[tokio::test]
async fn reset_empties_the_cache() {
    let settings = credential_settings();
    let cache = RecordingCache::default();
    cache.inner.insert(&settings, &token("cached")).await.unwrap();
    let broker = broker(cache, FakePrimary::default(), FakeSso::default(), FakeSts::default());
    let mut out = Vec::new();

    assert_eq!(tasks::reset(&broker, &mut out).await.unwrap(), 0);

    assert!(out.is_empty());
    assert!(broker.cache.inner.is_empty().await);
}
