use serde::Deserialize;

use crate::config::settings::SettingsConfig;

/// ================================
/// Full broker configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BrokerConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Acquisition settings
/// ================================
/// Immutable per-request credential configuration.
///
/// A non-empty `credentials_json` routes acquisition through the OAuth2 fetcher,
/// otherwise a non-empty `email` routes it through the SSO delegate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// raw credential payload (service account or authorized user JSON)
    pub credentials_json: Option<String>,
    /// identity for the SSO delegate
    pub email: Option<String>,
    /// space separated scopes
    pub scope: String,
    pub audience: Option<String>,
    pub quota_project: Option<String>,
    /// exchange the fetched token through STS before caching it
    pub sts: bool,
}

impl Settings {
    pub fn credentials(&self) -> Option<&str> {
        non_empty(self.credentials_json.as_deref())
    }

    pub fn email(&self) -> Option<&str> {
        non_empty(self.email.as_deref())
    }

    pub fn audience(&self) -> Option<&str> {
        non_empty(self.audience.as_deref())
    }

    pub fn quota_project(&self) -> Option<&str> {
        non_empty(self.quota_project.as_deref())
    }

    /// SSO is used only when there is no credential payload but there is an identity
    pub fn uses_sso(&self) -> bool {
        self.credentials().is_none() && self.email().is_some()
    }
}

/// ================================
/// Task settings
/// ================================
/// Presentation and execution options of a single command. Never cached.
#[derive(Debug, Clone)]
pub struct TaskSettings {
    /// output format selector, validated by `OutputFormat::from_str`
    pub format: String,
    pub sso_cli: String,
    pub curl_cli: String,
    pub url: Option<String>,
    pub extra_args: Vec<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

static SCOPE_PREFIX: &str = "https://www.googleapis.com/auth/";
static OPENID_SCOPES: [&str; 3] = ["openid", "email", "profile"];

/// Join scopes into the space separated form, expanding short names
/// (`cloud-platform` → `https://www.googleapis.com/auth/cloud-platform`).
pub fn expand_scopes(scopes: &[String]) -> String {
    scopes
        .iter()
        .flat_map(|s| s.split([',', ' ']))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.contains("://") || OPENID_SCOPES.contains(&s) {
                s.to_string()
            } else {
                format!("{}{}", SCOPE_PREFIX, s)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
