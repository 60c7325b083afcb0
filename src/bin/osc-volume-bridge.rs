//! OSC Volume Bridge
//!
//! Listens for OSC over UDP and applies volume and mute commands to the
//! default Windows audio devices and per-application sessions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use osc_volume_bridge::{audio, config::AppConfig, ServerController};

#[derive(Parser, Debug)]
#[command(name = "osc-volume-bridge", version, about)]
struct Args {
    /// UDP port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "osc_volume_bridge=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Write the effective configuration to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.network.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if args.write_config {
        let path = args
            .config
            .or_else(AppConfig::default_path)
            .context("no config directory available on this platform")?;
        config.save(&path)?;
        tracing::info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    tracing::info!("Starting OSC Volume Bridge");

    let controller = ServerController::new(config.network.clone(), audio::system_backend());
    let state = controller
        .start_default()
        .with_context(|| format!("could not listen on UDP port {}", config.network.port))?;
    tracing::info!("Server {} - press Ctrl+C to stop", state);

    tokio::signal::ctrl_c().await?;

    let status = controller.status();
    if let Some(stats) = status.stats {
        tracing::info!(
            "Shutting down: {} messages, {} handled, {} unmatched, {} rejected, {} failed",
            stats.messages,
            stats.handled,
            stats.unmatched,
            stats.rejected,
            stats.failed
        );
    }

    // Stop joins the listener thread; keep it off the async workers
    tokio::task::spawn_blocking(move || controller.stop()).await?;
    tracing::info!("Stopped");
    Ok(())
}
