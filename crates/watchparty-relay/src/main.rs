//! watchparty-relay: relay server binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use watchparty_relay::{Overrides, RelayConfig, RelayServer};

/// watchparty-relay: watch party relay server
#[derive(Parser, Debug)]
#[command(name = "watchparty-relay", version, about = "Watch party relay server")]
struct Cli {
    /// Listen address
    #[arg(long)]
    bind: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Websocket path
    #[arg(long)]
    path: Option<String>,

    /// Maximum concurrent peers
    #[arg(long)]
    max_peers: Option<usize>,

    /// Do not send the last playback command to new peers
    #[arg(long)]
    no_replay: bool,

    /// Config file path
    #[arg(long, default_value = "~/.watchparty/relay.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting watchparty-relay");

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("watchparty-relay: {e:#}");
        std::process::exit(1);
    }

    info!("watchparty-relay stopped");
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = PathBuf::from(&cli.config);
    let config = RelayConfig::load(
        Some(&config_path),
        Overrides {
            bind: cli.bind,
            port: cli.port,
            path: cli.path,
            max_peers: cli.max_peers,
            no_replay: cli.no_replay,
        },
    )
    .context("failed to load config")?;

    let server = RelayServer::bind(&config)
        .await
        .context("failed to start relay")?;

    tokio::select! {
        result = server.run() => result.context("relay failed")?,
        _ = shutdown_signal() => info!("received shutdown signal"),
    }
    Ok(())
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
