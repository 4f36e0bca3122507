//! mapnu authentication server

use anyhow::Context;
use clap::Parser;
use mapnu_auth::AuthService;
use mapnu_server::{ServerConfig, router, serve, shutdown_signal, telemetry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Google sign-in exchange and session-protected API for mapnu
#[derive(Parser, Debug)]
#[command(name = "mapnu-server", version, about)]
struct Cli {
    /// Configuration file (.toml, .yaml or .json); without it settings come from
    /// JWT_SECRET, GOOGLE_CLIENT_ID and friends
    #[arg(long, short = 'c', env = "MAPNU_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration
    #[arg(long, short = 'b')]
    bind: Option<SocketAddr>,

    /// Log filter used when RUST_LOG is unset, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::from_env().context("loading configuration from environment")?,
    };
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    config.json_logs |= cli.json_logs;

    telemetry::init_tracing(&config.log_level, config.json_logs)
        .context("initializing logging")?;

    let auth = Arc::new(AuthService::from_config(&config.auth)?);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(addr = %config.bind, "mapnu-server listening");

    serve(listener, router(auth), shutdown_signal(), config.shutdown_timeout()).await?;

    info!("mapnu-server stopped");
    Ok(())
}
