//! Telegram notifications for collection price changes.
//!
//! This crate provides:
//! - A `ChatTransport` capability with a Telegram Bot API implementation
//! - Price update message formatting with change indicators
//! - A `Notifier` bound to one destination channel

pub mod notifier;
pub mod telegram;

pub use notifier::{format_change, format_price_update, Notifier};
pub use telegram::{ChatTransport, MockTransport, TelegramError, TelegramTransport};
