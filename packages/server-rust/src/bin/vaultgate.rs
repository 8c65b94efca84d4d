//! `vaultgate` server binary: the process composition root.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use vaultgate_server::network::handlers::builtin_router;
use vaultgate_server::network::{CorsPolicy, NetworkConfig, NetworkModule};
use vaultgate_server::storage::RedbStoreInitializer;
use vaultgate_server::telemetry::{init_tracing, install_metrics_exporter};
use vaultgate_server::traits::parse_binding;
use vaultgate_server::{InitializationGate, PlatformEnv, RequestDispatcher};

/// Serves requests, initializing the store on first use.
#[derive(Debug, Parser)]
#[command(about, version)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0", env = "VAULTGATE_HOST")]
    host: String,
    /// Port to listen on. 0 picks a free port.
    #[arg(long, default_value_t = 8787, env = "VAULTGATE_PORT")]
    port: u16,
    /// Path of the embedded database file.
    #[arg(long, default_value = "data/vaultgate.redb", env = "VAULTGATE_DB_PATH")]
    db_path: PathBuf,
    /// Allowed CORS origins, comma separated. `*` allows any origin.
    #[arg(
        long,
        default_value = "*",
        value_delimiter = ',',
        env = "VAULTGATE_CORS_ORIGINS"
    )]
    cors_origins: Vec<String>,
    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, default_value_t = 30, env = "VAULTGATE_DRAIN_TIMEOUT_SECS")]
    drain_timeout_secs: u64,
    /// Emit logs as JSON lines.
    #[arg(long, env = "VAULTGATE_LOG_JSON")]
    log_json: bool,
    /// Serve Prometheus metrics on this address.
    #[arg(long, env = "VAULTGATE_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
    /// Platform binding passed to the store and router, as NAME=VALUE.
    #[arg(long = "binding", value_parser = parse_binding)]
    bindings: Vec<(String, String)>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Some(addr) = cli.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let env = PlatformEnv::from_pairs(cli.bindings);
    let gate = Arc::new(InitializationGate::new(Arc::new(
        RedbStoreInitializer::new(&cli.db_path),
    )));
    let dispatcher = Arc::new(RequestDispatcher::new(
        gate,
        Arc::new(builtin_router()),
        CorsPolicy::from_origins(&cli.cors_origins),
    ));

    let config = NetworkConfig {
        host: cli.host,
        port: cli.port,
        drain_timeout: Duration::from_secs(cli.drain_timeout_secs),
    };

    info!(db_path = %cli.db_path.display(), bindings = env.len(), "Starting vaultgate");

    let mut module = NetworkModule::new(config, dispatcher, env);
    module.start().await?;
    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
}
