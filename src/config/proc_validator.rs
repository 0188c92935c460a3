//! Broker configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates endpoint URLs, delegate commands, cache/metrics paths and logging

use std::path::Path;

use reqwest::Url;
use tracing::{error, info};

use crate::config::settings::{CommandsConfig, EndpointsConfig, SettingsConfig};
use crate::config::sources::BrokerConfig;

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_broker_config(cfg: &BrokerConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_endpoints(&cfg.settings.endpoints, &mut errors);
    validate_commands(&cfg.settings.commands, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    // safety margin sane bounds
    if let Some(s) = settings.safety_margin_seconds {
        if s > 60 * 60 * 24 {
            errors.push(format!(
                "settings.safety_margin_seconds ({}) is unreasonably large",
                s
            ));
        }
    }

    if let Some(path) = &settings.cache.path {
        if path.trim().is_empty() {
            errors.push("settings.cache.path must not be empty".to_string());
        }
    }

    if let Some(path) = &settings.metrics.textfile_path {
        if !Path::new(path).is_absolute() {
            errors.push(format!(
                "settings.metrics.textfile_path '{}' must be an absolute path, relative paths are not allowed",
                path
            ));
        }
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

/// ENDPOINTS: every remote endpoint must be an absolute http(s) URL
fn validate_endpoints(endpoints: &EndpointsConfig, errors: &mut Vec<String>) {
    validate_url("settings.endpoints.token_url", &endpoints.token_url, errors);
    validate_url("settings.endpoints.sts_url", &endpoints.sts_url, errors);
    validate_url("settings.endpoints.token_info_url", &endpoints.token_info_url, errors);
}

fn validate_url(path: &str, value: &str, errors: &mut Vec<String>) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{} '{}' has unsupported scheme '{}'; allowed: http, https",
            path,
            value,
            url.scheme()
        )),
        Err(e) => errors.push(format!("{} '{}' is not a valid URL: {}", path, value, e)),
    }
}

fn validate_commands(commands: &CommandsConfig, errors: &mut Vec<String>) {
    if commands.sso_cli.trim().is_empty() {
        errors.push("settings.commands.sso_cli must not be empty".to_string());
    }
    if commands.curl_cli.trim().is_empty() {
        errors.push("settings.commands.curl_cli must not be empty".to_string());
    }
}
