//! Application configuration.

use clap::Parser;
use floorwatch_feeds::{ChromeConfig, SourceConfig, DEFAULT_BASE_URL};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Floor price monitor CLI. Every option can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "floorwatch")]
#[command(about = "Collection floor price and best offer monitor", long_about = None)]
pub struct Args {
    /// Collection slug to monitor
    #[arg(short, long, env = "OPENSEA_COLLECTION_SLUG", default_value = "hypio")]
    pub collection: String,

    /// Seconds between checks
    #[arg(short, long, env = "CHECK_INTERVAL", default_value_t = 300)]
    pub interval: u64,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Telegram channel: numeric chat id or @username
    #[arg(long, env = "TELEGRAM_CHANNEL_ID")]
    pub channel_id: Option<String>,

    /// File holding the last notified prices
    #[arg(long, env = "MEMORY_FILE", default_value = "memory.json")]
    pub memory_file: PathBuf,

    /// Log file, appended to alongside console output
    #[arg(long, env = "LOG_FILE", default_value = "price_monitor.log")]
    pub log_file: PathBuf,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Marketplace collection base URL
    #[arg(long, env = "OPENSEA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Page loads per check before giving up
    #[arg(long, default_value_t = 5)]
    pub max_retries: u32,

    /// Bound on page load and on each element wait, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub fetch_timeout_ms: u64,

    /// Pause between page loads within one check, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub retry_delay_ms: u64,

    /// Chrome/Chromium executable (auto-detected when unset)
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    MissingCredential(&'static str),
    #[error("Check interval must be at least one second")]
    InvalidInterval,
    #[error("At least one fetch attempt is required")]
    InvalidRetries,
}

/// Validated monitor settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub collection: String,
    pub interval: Duration,
    pub bot_token: String,
    pub channel_id: String,
    pub memory_file: PathBuf,
    pub source: SourceConfig,
    pub chrome: ChromeConfig,
}

impl MonitorConfig {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let bot_token = required(args.bot_token, "TELEGRAM_BOT_TOKEN")?;
        let channel_id = required(args.channel_id, "TELEGRAM_CHANNEL_ID")?;

        if args.interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if args.max_retries == 0 {
            return Err(ConfigError::InvalidRetries);
        }

        Ok(Self {
            collection: args.collection,
            interval: Duration::from_secs(args.interval),
            bot_token,
            channel_id,
            memory_file: args.memory_file,
            source: SourceConfig {
                base_url: args.base_url,
                max_retries: args.max_retries,
                timeout: Duration::from_millis(args.fetch_timeout_ms),
                retry_delay: Duration::from_millis(args.retry_delay_ms),
            },
            chrome: ChromeConfig {
                chrome_executable: args.chrome_path,
                ..Default::default()
            },
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}
