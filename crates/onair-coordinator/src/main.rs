//! onair Coordinator Daemon
//!
//! Accepts WebSocket connections from browser clients and rotates a single
//! on-air slot among them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onair_core::config::{self, CoordinatorConfig};
use onair_coordinator::connection::run_idle_reaper;
use onair_coordinator::server::WsServer;
use onair_coordinator::{Coordinator, Gateways};

#[derive(Parser)]
#[command(name = "onair-coordinator")]
#[command(about = "onair live-broadcast rotation coordinator")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "ONAIR_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file to the config path and exit
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.init_config {
        let path = args.config.unwrap_or_else(config::default_config_path);
        if path.exists() {
            anyhow::bail!("Refusing to overwrite existing config at {:?}", path);
        }
        config::save_config(&path, &CoordinatorConfig::default())
            .with_context(|| format!("Failed to write config to {:?}", path))?;
        tracing::info!("Wrote default configuration to {:?}", path);
        return Ok(());
    }

    tracing::info!("onair coordinator starting...");

    let config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                CoordinatorConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            CoordinatorConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;

    let bind_addr = args.bind.unwrap_or_else(|| config.bind_address.clone());
    tracing::info!(
        "Slot {}s, vote extension {}s, idle timeout {}s",
        config.slot_duration.as_secs(),
        config.vote_extension.as_secs(),
        config.idle_timeout.as_secs()
    );

    let gateways =
        Gateways::from_config(&config.gateway).context("Failed to set up account gateway")?;

    let cancel = CancellationToken::new();

    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    let reap_interval = config.reap_interval();
    let (coordinator, coordinator_task) = Coordinator::spawn(config, gateways, cancel.clone());

    let reaper = tokio::spawn(run_idle_reaper(
        coordinator.clone(),
        reap_interval,
        cancel.clone(),
    ));

    let server = WsServer::new(coordinator, cancel.clone());
    let result = server.run(&bind_addr).await;

    // A bind failure returns before any signal; stop the background tasks too.
    cancel.cancel();
    let _ = tokio::join!(reaper, coordinator_task);

    result?;
    tracing::info!("Coordinator shutdown complete");
    Ok(())
}
