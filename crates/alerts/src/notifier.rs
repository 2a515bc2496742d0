//! Price change notification logic.

use crate::telegram::ChatTransport;
use floorwatch_core::{magnitude, PriceSnapshot};
use teloxide::utils::html;
use tracing::{error, info};

/// Render one price for the update message.
///
/// With no previous value, or an identical previous string, the price is
/// shown bold with no indicator. Otherwise the leading amounts decide:
/// strictly higher gets `+`, everything else gets `-`. An unreadable amount
/// counts as zero.
pub fn format_change(new_price: &str, old_price: Option<&str>) -> String {
    let bold = format!("<b>{}</b>", html::escape(new_price));
    let old_price = match old_price {
        Some(old) if !old.is_empty() && old != new_price => old,
        _ => return bold,
    };

    let new_value = magnitude(new_price).unwrap_or(0.0);
    let old_value = magnitude(old_price).unwrap_or(0.0);
    if new_value > old_value {
        format!("{} +", bold)
    } else {
        format!("{} -", bold)
    }
}

/// Full update message for a collection.
pub fn format_price_update(
    collection: &str,
    new: &PriceSnapshot,
    previous: Option<&PriceSnapshot>,
) -> String {
    let floor_display = format_change(
        &new.floor_price,
        previous.map(|p| p.floor_price.as_str()),
    );
    let best_offer_display = format_change(
        &new.best_offer,
        previous.map(|p| p.best_offer.as_str()),
    );

    format!(
        "<b>{}</b> Update\n\n\
         Floor Price: {}\n\
         Best Offer: {}",
        html::escape(&collection.to_uppercase()),
        floor_display,
        best_offer_display
    )
}

/// Sends price updates to a single channel.
pub struct Notifier<T> {
    transport: T,
    channel: String,
}

impl<T: ChatTransport> Notifier<T> {
    pub fn new(transport: T, channel: impl Into<String>) -> Self {
        Self {
            transport,
            channel: channel.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Send a text message (HTML allowed). Returns true when delivered.
    pub async fn send_message(&self, text: &str) -> bool {
        match self.transport.deliver(&self.channel, text).await {
            Ok(()) => {
                info!(channel = %self.channel, "Message sent successfully");
                true
            }
            Err(e) => {
                error!(channel = %self.channel, error = %e, "Failed to send message");
                false
            }
        }
    }

    /// Announce new prices, marking each against `previous` when given.
    pub async fn notify(
        &self,
        collection: &str,
        new: &PriceSnapshot,
        previous: Option<&PriceSnapshot>,
    ) -> bool {
        let message = format_price_update(collection, new, previous);
        self.send_message(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::MockTransport;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_change_increase() {
        assert_eq!(format_change("0.44 ETH", Some("0.40 ETH")), "<b>0.44 ETH</b> +");
    }

    #[test]
    fn test_format_change_decrease() {
        assert_eq!(format_change("0.30 ETH", Some("0.40 ETH")), "<b>0.30 ETH</b> -");
    }

    #[test]
    fn test_format_change_identical() {
        assert_eq!(format_change("0.40 ETH", Some("0.40 ETH")), "<b>0.40 ETH</b>");
        assert_eq!(format_change("0.40 ETH", None), "<b>0.40 ETH</b>");
    }

    #[test]
    fn test_format_change_numeric_tie_marks_decrease() {
        assert_eq!(format_change("0.400 ETH", Some("0.40 ETH")), "<b>0.400 ETH</b> -");
        // Currency change alone is still a textual change.
        assert_eq!(format_change("0.4 WETH", Some("0.4 ETH")), "<b>0.4 WETH</b> -");
    }

    #[test]
    fn test_format_change_against_zero_baseline() {
        assert_eq!(format_change("0.44 ETH", Some("0 ETH")), "<b>0.44 ETH</b> +");
        assert_eq!(format_change("0.44 ETH", Some("garbage")), "<b>0.44 ETH</b> +");
    }

    #[test]
    fn test_format_price_update() {
        let previous = PriceSnapshot::new("0.40 ETH", "0.41 WETH");
        let new = PriceSnapshot::new("0.44 ETH", "0.41 WETH");

        assert_eq!(
            format_price_update("hypio", &new, Some(&previous)),
            "<b>HYPIO</b> Update\n\nFloor Price: <b>0.44 ETH</b> +\nBest Offer: <b>0.41 WETH</b>"
        );
        assert_eq!(
            format_price_update("hypio", &new, None),
            "<b>HYPIO</b> Update\n\nFloor Price: <b>0.44 ETH</b>\nBest Offer: <b>0.41 WETH</b>"
        );
    }

    #[test]
    fn test_format_price_update_escapes_html() {
        let new = PriceSnapshot::new("1 <ETH>", "1 ETH");
        let message = format_price_update("a&b", &new, None);
        assert!(message.starts_with("<b>A&amp;B</b> Update"));
        assert!(message.contains("<b>1 &lt;ETH&gt;</b>"));
    }

    #[tokio::test]
    async fn test_notify_delivers_to_channel() {
        let notifier = Notifier::new(MockTransport::new(), "@floor");
        let new = PriceSnapshot::new("0.44 ETH", "0.41 WETH");

        assert!(notifier.notify("hypio", &new, Some(&PriceSnapshot::default())).await);

        let sent = notifier.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "@floor");
        assert!(sent[0].1.contains("Floor Price: <b>0.44 ETH</b> +"));
    }

    #[tokio::test]
    async fn test_notify_reports_failure() {
        let notifier = Notifier::new(MockTransport::new(), "@floor");
        notifier.transport().set_fail(true);

        let new = PriceSnapshot::new("0.44 ETH", "0.41 WETH");
        assert!(!notifier.notify("hypio", &new, None).await);
        assert!(notifier.transport().sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_message() {
        let notifier = Notifier::new(MockTransport::new(), "-10042");
        assert!(notifier.send_message("hello").await);
        assert_eq!(
            notifier.transport().sent(),
            vec![("-10042".to_string(), "hello".to_string())]
        );
    }
}
