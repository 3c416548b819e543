//! watchparty: terminal client for synchronized video watching.
//!
//! Connects to a watchparty relay, drives a simulated player, and reads
//! commands and chat from stdin.

mod config;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use watchparty_client::{session, Role, SimulatedPlayer};

/// watchparty: watch videos in sync
#[derive(Parser)]
#[command(name = "watchparty", version = "0.1.0", about = "Watch videos in sync with friends through a relay")]
struct Cli {
    /// Relay host
    #[arg(long)]
    host: Option<String>,

    /// Relay port
    #[arg(short, long)]
    port: Option<u16>,

    /// Websocket path on the relay
    #[arg(long)]
    path: Option<String>,

    /// Chat display name
    #[arg(short, long)]
    name: Option<String>,

    /// Join as a guest (cannot load videos)
    #[arg(long)]
    guest: bool,

    /// Length of every video in the simulated player, in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Config file path
    #[arg(long = "config")]
    config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "watchparty=debug,watchparty_cli=debug,watchparty_client=debug,watchparty_core=debug"
    } else {
        "watchparty=warn,watchparty_cli=warn,watchparty_client=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge CLI flags over the file config.
fn effective_config(cli: &Cli) -> Result<config::Config> {
    let path = cli.config.clone().unwrap_or_else(config::Config::default_path);
    let mut cfg = config::Config::load(&path)?;

    if let Some(host) = &cli.host {
        cfg.relay.host = host.clone();
    }
    if let Some(port) = cli.port {
        cfg.relay.port = port;
    }
    if let Some(path) = &cli.path {
        cfg.relay.path = path.clone();
    }
    if let Some(name) = &cli.name {
        cfg.session.name = name.clone();
    }
    if cli.guest {
        cfg.session.role = Role::Guest;
    }
    if let Some(duration) = cli.duration {
        cfg.session.video_duration_secs = duration;
    }
    Ok(cfg)
}

async fn run(cfg: config::Config) -> Result<()> {
    let session_config = cfg.session_config();
    let name = cfg.display_name();
    info!(url = %session_config.url, name = %name, role = ?session_config.role, "joining watch party");

    let (player, player_events) = SimulatedPlayer::new(cfg.session.video_duration_secs);
    let view = terminal::TerminalView::stdout();
    let snapshot = view.snapshot();

    println!("watchparty: joining {} as {name}", session_config.url);
    println!("type /help for commands");

    let (intent_tx, intents) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            terminal::read_input(std::io::stdin().lock(), name, intent_tx, snapshot);
        })
        .context("failed to start input thread")?;

    session::run(session_config, player, player_events, view, intents)
        .await
        .context("session failed")?;

    println!("bye");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = effective_config(&cli).and_then(|cfg| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(run(cfg))
    });

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("watchparty: {e:#}");
        std::process::exit(1);
    }
}
