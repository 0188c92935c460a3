use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::sources::Settings;

/// Every `Settings` field that changes which token comes back takes part in the key.
/// `sts` is included so an unexchanged token is never served to an STS request.
#[derive(Serialize)]
struct CacheKeyFields<'a> {
    credentials: Option<&'a str>,
    email: Option<&'a str>,
    scope: &'a str,
    audience: Option<&'a str>,
    quota_project: Option<&'a str>,
    sts: bool,
}

/// Deterministic cache key: base64url(sha256(json(fields))).
///
/// Credential material (private keys, refresh tokens) never appears in the cache file.
pub fn cache_key(settings: &Settings) -> String {
    let fields = CacheKeyFields {
        credentials: settings.credentials(),
        email: settings.email(),
        scope: settings.scope.trim(),
        audience: settings.audience(),
        quota_project: settings.quota_project(),
        sts: settings.sts,
    };
    // a struct of strings and a bool always serializes
    let json = serde_json::to_vec(&fields).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(Sha256::digest(&json))
}
