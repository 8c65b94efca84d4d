//! Logging and metrics setup.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

/// Counter: store initialization attempts started.
pub const STORE_INIT_ATTEMPTS: &str = "vaultgate_store_init_attempts_total";
/// Counter: store initialization attempts that failed.
pub const STORE_INIT_FAILURES: &str = "vaultgate_store_init_failures_total";
/// Counter: dispatched requests, labelled `store = required | skipped`.
pub const REQUESTS: &str = "vaultgate_requests_total";

/// Installs the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info`. Output goes to stderr, as JSON
/// lines when `json` is set.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Serves Prometheus metrics on `addr`. Must be called within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the recorder is already installed or the listener
/// cannot be set up.
pub fn install_metrics_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter on {addr}: {e}"))?;
    tracing::info!(%addr, "Serving Prometheus metrics");
    Ok(())
}
