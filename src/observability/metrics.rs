use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::sync::OnceCell;
use tracing::{debug, info};

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            debug!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

pub const LABEL_HIT: &str = "hit";
pub const LABEL_MISS: &str = "miss";
pub const LABEL_UNAVAILABLE: &str = "unavailable";
pub const LABEL_FETCHED: &str = "fetched";
pub const LABEL_FAILED: &str = "failed";
pub const LABEL_VALID: &str = "valid";
pub const LABEL_INVALID: &str = "invalid";

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Cache metrics
    pub cache_lookups: IntCounterVec,
    pub cache_clears: IntCounter,

    // Acquisition metrics
    pub acquisitions: IntCounterVec,
    pub acquisition_failures: IntCounterVec,
    pub source_fetch_duration: HistogramVec,

    // Validation metrics
    pub token_info_requests: IntCounterVec,

    // Config
    pub config_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("tokenbroker".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Cache
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Token cache lookups by result"), &["result"]).expect("metric definition"),
            cache_clears: IntCounter::new("cache_clears_total", "Explicit token cache resets").expect("metric definition"),

            // Acquisition
            acquisitions: IntCounterVec::new(Opts::new("acquisitions_total", "Token acquisitions by outcome"), &["outcome"]).expect("metric definition"),
            acquisition_failures: IntCounterVec::new(Opts::new("acquisition_failures_total", "Failed acquisitions by stage"), &["stage"]).expect("metric definition"),
            source_fetch_duration: HistogramVec::new(HistogramOpts::new("source_fetch_duration_seconds", "Remote fetch duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["source"]).expect("metric definition"),

            // Validation
            token_info_requests: IntCounterVec::new(Opts::new("token_info_requests_total", "Token info lookups by result"), &["result"]).expect("metric definition"),

            config_errors: IntCounter::new("config_errors_total", "Config parse and validation errors").expect("metric definition"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.cache_lookups.clone())).expect("metric registration");
        reg.register(Box::new(metrics.cache_clears.clone())).expect("metric registration");
        reg.register(Box::new(metrics.acquisitions.clone())).expect("metric registration");
        reg.register(Box::new(metrics.acquisition_failures.clone())).expect("metric registration");
        reg.register(Box::new(metrics.source_fetch_duration.clone())).expect("metric registration");
        reg.register(Box::new(metrics.token_info_requests.clone())).expect("metric registration");
        reg.register(Box::new(metrics.config_errors.clone())).expect("metric registration");

        metrics
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Write the metrics for a node-exporter textfile collector.
///
/// The collector may read at any moment, so the file is replaced via rename.
pub async fn export_textfile(path: &Path) -> Result<()> {
    let body = get_metrics().await.encode()?;
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("failed to write metrics to '{}'", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move metrics into '{}'", path.display()))?;
    info!("metrics written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exports_textfile_with_registered_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token_broker.prom");

        get_metrics().await.acquisitions.with_label_values(&[LABEL_HIT]).inc();
        export_textfile(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("tokenbroker_acquisitions_total{outcome=\"hit\"}"));
        assert!(!dir.path().join("token_broker.prom.tmp").exists());
    }
}
