//! `plaza scheduler` - long-running sweeper process.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics;
use crate::services::Services;

/// Run scheduled sweeps until Ctrl-C.
pub async fn execute(config: &Config) -> Result<()> {
    if let Some(addr) = config.sweeper.metrics_socket()? {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        metrics::describe();
        info!(%addr, "Serving metrics");
    }

    let services = Services::from_config(config)?;
    let sweeper = services.sweeper(config);

    sweeper
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C, stopping sweeper");
            }
        })
        .await
}
