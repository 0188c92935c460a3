use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::sources::BrokerConfig;
use crate::observability::metrics::get_metrics;
use crate::utils::constants::DEFAULT_SAFETY_MARGIN_SECS;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<BrokerConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config '{}'", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<BrokerConfig> {
    let metrics = get_metrics().await;
    // an empty document is a valid, all-defaults config
    let mut broker_config: BrokerConfig = if content.trim().is_empty() {
        BrokerConfig::default()
    } else {
        serde_yaml::from_str(&content).inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_errors.inc();
        })?
    };

    // Apply defaults
    if broker_config.settings.logging.is_none() {
        broker_config.settings.logging = Some(LoggingConfig::new("warn".to_owned(), LogFormat::from_env()));
    }
    if broker_config.settings.safety_margin_seconds.is_none() {
        broker_config.settings.safety_margin_seconds = Some(DEFAULT_SAFETY_MARGIN_SECS);
    }

    debug!("validation config ...");
    proc_validator::validate_broker_config(&broker_config).map_err(|errors| {
        metrics.config_errors.inc_by(errors.len() as u64);
        anyhow!("config is not valid:\n  {}", errors.join("\n  "))
    })?;

    Ok(broker_config)
}

/// Replace `${VAR}` and `${VAR:default}` with environment values
pub fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn expands_env_vars_with_defaults() {
        std::env::set_var("TOKEN_BROKER_TEST_STS", "http://127.0.0.1:9000/v1/token");
        std::env::remove_var("TOKEN_BROKER_TEST_MISSING");

        let out = expand_env_vars(
            "sts: ${TOKEN_BROKER_TEST_STS}\ninfo: ${TOKEN_BROKER_TEST_MISSING:http://localhost/info?t=}",
        )
        .unwrap();

        assert_eq!(out, "sts: http://127.0.0.1:9000/v1/token\ninfo: http://localhost/info?t=");
        std::env::remove_var("TOKEN_BROKER_TEST_STS");
    }

    #[tokio::test]
    async fn empty_config_gets_defaults() {
        let cfg = parse_config(String::new()).await.unwrap();

        assert!(cfg.settings.cache.is_enabled);
        assert_eq!(cfg.settings.safety_margin_seconds, Some(DEFAULT_SAFETY_MARGIN_SECS));
        assert_eq!(cfg.settings.logging.unwrap().level, "warn");
        assert_eq!(cfg.settings.commands.curl_cli, "curl");
    }

    #[tokio::test]
    async fn parses_full_config() {
        let yaml = r#"
settings:
  safety_margin_seconds: 30
  logging:
    level: debug
    format: json
  cache:
    is_enabled: false
  endpoints:
    sts_url: "http://127.0.0.1:8080/v1/token"
  commands:
    sso_cli: "/usr/local/bin/sso"
  metrics:
    textfile_path: "/var/lib/node_exporter/token_broker.prom"
"#;
        let cfg = parse_config(yaml.to_string()).await.unwrap();

        assert_eq!(cfg.settings.safety_margin_seconds, Some(30));
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Json);
        assert!(!cfg.settings.cache.is_enabled);
        assert_eq!(cfg.settings.endpoints.sts_url, "http://127.0.0.1:8080/v1/token");
        assert_eq!(
            cfg.settings.endpoints.token_url,
            crate::utils::constants::DEFAULT_TOKEN_URL
        );
        assert_eq!(cfg.settings.commands.sso_cli, "/usr/local/bin/sso");
        assert_eq!(cfg.settings.commands.curl_cli, "curl");
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let yaml = r#"
settings:
  endpoints:
    sts_url: "not a url"
"#;
        let err = parse_config(yaml.to_string()).await.unwrap_err();
        assert!(err.to_string().contains("config is not valid"));
    }
}
