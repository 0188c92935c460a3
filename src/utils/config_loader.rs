use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::config::proc_loader::{file_to_config, parse_config};
use crate::config::sources::BrokerConfig;
use crate::utils::constants::{BROKER_HOME_DIR, CONFIG_FILE_NAME};

/// Load the broker config.
///
/// An explicit path must exist. Without one, `~/.token-broker/config.yaml` is used
/// when present and built-in defaults otherwise.
pub async fn run(config_path: Option<&str>) -> Result<BrokerConfig> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                debug!("no config file found, using defaults");
                return parse_config(String::new()).await;
            }
        },
    };
    load(&path).await
}

async fn load(path: &Path) -> Result<BrokerConfig> {
    file_to_config(path)
        .await
        .map_err(|e| anyhow!(format!("Invalid config format: {:#}", e)))
}

pub fn broker_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(BROKER_HOME_DIR))
}

fn default_config_path() -> Option<PathBuf> {
    broker_home().map(|home| home.join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn loads_explicit_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "settings:\n  cache:\n    path: /tmp/broker-cache.json").unwrap();

        let cfg = run(file.path().to_str()).await.unwrap();

        assert_eq!(cfg.settings.cache.path.as_deref(), Some("/tmp/broker-cache.json"));
    }

    #[tokio::test]
    async fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");

        let err = run(missing.to_str()).await.unwrap_err();

        assert!(err.to_string().starts_with("Invalid config format"));
    }
}
