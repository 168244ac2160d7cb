//! Application entrypoint and state wiring.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_node::config::NodeConfig;
use ledger_node::model::ValidationMode;
use ledger_node::{router, AppState};

#[derive(Parser)]
#[command(author, version, about = "Replicated hash-linked ledger node")]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to serve HTTP on
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Peer address to register at startup (repeatable)
    #[arg(long = "peer")]
    peers: Vec<String>,
    /// Run a consensus pass every N seconds
    #[arg(long)]
    consensus_interval_secs: Option<u64>,
    /// Also require contiguous indices and a well-formed genesis block
    #[arg(long, default_value_t = false)]
    strict: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default node configuration file
    GenerateConfig {
        #[arg(short, long, default_value = "config/node.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { path }) = &cli.command {
        NodeConfig::default().save(path)?;
        info!(path = %path.display(), "wrote default config");
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    serve(config).await
}

fn resolve_config(cli: &Cli) -> Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    config.peers.extend(cli.peers.iter().cloned());
    if cli.consensus_interval_secs.is_some() {
        config.consensus_interval_secs = cli.consensus_interval_secs;
    }
    if cli.strict {
        config.validation = ValidationMode::Strict;
    }
    Ok(config)
}

async fn serve(config: NodeConfig) -> Result<()> {
    let state = AppState::new(&config)?;
    info!(
        peers = state.peers.len(),
        validation = ?config.validation,
        "ledger initialised at genesis"
    );

    if let Some(period) = config.consensus_interval() {
        spawn_consensus_timer(state.clone(), period);
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(addr = %config.listen, "ledger node listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("ledger node stopped");
    Ok(())
}

fn spawn_consensus_timer(state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick fires immediately; peers rarely answer that early
        ticker.tick().await;
        loop {
            ticker.tick().await;
            state.consensus.run(&state.ledger, &state.peers).await;
        }
    });
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
