use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_CURL_CLI, DEFAULT_SSO_CLI, DEFAULT_STS_URL, DEFAULT_TOKEN_INFO_URL, DEFAULT_TOKEN_URL,
};

/// ================================
/// Global broker-wide settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    /// cached tokens expiring within this window are treated as misses
    pub safety_margin_seconds: Option<u64>,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// `false` keeps tokens in memory for the lifetime of the process only
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// defaults to `~/.token-broker/cache.json`
    pub path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { is_enabled: true, path: None }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_sts_url")]
    pub sts_url: String,
    /// the token is appended verbatim, so this must end with the query parameter name
    #[serde(default = "default_token_info_url")]
    pub token_info_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            sts_url: default_sts_url(),
            token_info_url: default_token_info_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    #[serde(default = "default_sso_cli")]
    pub sso_cli: String,
    #[serde(default = "default_curl_cli")]
    pub curl_cli: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self { sso_cli: default_sso_cli(), curl_cli: default_curl_cli() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MetricsConfig {
    /// node-exporter textfile collector target, written once the command finishes
    pub textfile_path: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "compact".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_sts_url() -> String {
    DEFAULT_STS_URL.to_string()
}

fn default_token_info_url() -> String {
    DEFAULT_TOKEN_INFO_URL.to_string()
}

fn default_sso_cli() -> String {
    DEFAULT_SSO_CLI.to_string()
}

fn default_curl_cli() -> String {
    DEFAULT_CURL_CLI.to_string()
}
