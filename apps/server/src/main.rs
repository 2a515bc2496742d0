//! Floor price monitor.
//!
//! Polls a marketplace collection page for its floor price and best offer
//! and posts a Telegram message whenever either changes.

mod config;
mod monitor;
mod store;

use clap::Parser;
use config::{Args, MonitorConfig};
use floorwatch_alerts::{Notifier, TelegramTransport};
use floorwatch_feeds::{ChromeRenderer, OpenSeaSource};
use monitor::Monitor;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use store::StateStore;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console and file logging. `RUST_LOG` overrides `level`.
fn init_logging(level: &str, log_file: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level, &args.log_file) {
        eprintln!("Failed to open log file {}: {}", args.log_file.display(), e);
        return ExitCode::FAILURE;
    }

    let config = match MonitorConfig::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("🚀 Floor price monitor starting...");
    info!("  Collection: {}", config.collection);
    info!("  Interval: {}s", config.interval.as_secs());
    info!("  Source: {}", config.source.base_url);
    info!(
        "  Fetch: {} attempts, {:?} timeout, {:?} between attempts",
        config.source.max_retries, config.source.timeout, config.source.retry_delay
    );

    let source = OpenSeaSource::new(
        ChromeRenderer::new(config.chrome.clone()),
        config.source.clone(),
    );
    let notifier = Notifier::new(
        TelegramTransport::new(config.bot_token.clone()),
        config.channel_id.clone(),
    );
    let store = StateStore::new(&config.memory_file);
    info!("  Memory file: {}", store.path().display());

    let mut monitor = Monitor::new(
        config.collection.clone(),
        config.interval,
        source,
        notifier,
        store,
    );
    info!("  Channel: {}", monitor.notifier().channel());
    info!("  Last known prices: {}", monitor.last_known());

    tokio::select! {
        _ = monitor.run() => {}
        _ = shutdown_signal() => warn!("Shutdown signal received"),
    }

    info!("👋 Floor price monitor stopped");
    ExitCode::SUCCESS
}
