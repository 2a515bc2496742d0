//! Chat delivery over the Telegram Bot API.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Capability to post an HTML-formatted text message to a channel.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn deliver(&self, channel: &str, text: &str) -> Result<(), TelegramError>;
}

/// Telegram transport. A new bot client is built for every message and
/// dropped once the request completes.
pub struct TelegramTransport {
    token: String,
}

impl TelegramTransport {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn deliver(&self, channel: &str, text: &str) -> Result<(), TelegramError> {
        let bot = Bot::new(&self.token);
        bot.send_message(recipient(channel), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

/// Numeric ids address a chat directly; anything else is a `@channel` username.
fn recipient(channel: &str) -> Recipient {
    match channel.trim().parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(channel.trim().to_string()),
    }
}

/// Mock transport that records messages instead of sending them.
pub struct MockTransport {
    sent: Mutex<Vec<(String, String)>>,
    should_fail: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent deliveries fail (or succeed again).
    pub fn set_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Delivered `(channel, text)` pairs, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn deliver(&self, channel: &str, text: &str) -> Result<(), TelegramError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TelegramError::Delivery("Mock failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((channel.to_string(), text.to_string()));
        }
        Ok(())
    }
}
