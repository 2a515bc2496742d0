//! Poll, compare, notify, persist.

use crate::store::{StateStore, StoreError};
use floorwatch_alerts::{ChatTransport, Notifier};
use floorwatch_core::PriceSnapshot;
use floorwatch_feeds::{OpenSeaSource, PageRenderer};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

/// What a single check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No valid prices this time.
    FetchFailed,
    /// Prices match the last notified snapshot.
    Unchanged,
    /// Change announced and persisted.
    Notified,
    /// Change detected but delivery failed; state left as is.
    NotifyFailed,
}

/// Single-collection monitor. Owns the last-known snapshot and is the only
/// writer of the state file.
pub struct Monitor<R, T> {
    collection: String,
    interval: Duration,
    source: OpenSeaSource<R>,
    notifier: Notifier<T>,
    store: StateStore,
    last_known: PriceSnapshot,
}

impl<R: PageRenderer, T: ChatTransport> Monitor<R, T> {
    /// Create a monitor, loading the last-known snapshot from `store`.
    pub fn new(
        collection: impl Into<String>,
        interval: Duration,
        source: OpenSeaSource<R>,
        notifier: Notifier<T>,
        store: StateStore,
    ) -> Self {
        let last_known = store.load();
        Self {
            collection: collection.into(),
            interval,
            source,
            notifier,
            store,
            last_known,
        }
    }

    pub fn last_known(&self) -> &PriceSnapshot {
        &self.last_known
    }

    pub fn notifier(&self) -> &Notifier<T> {
        &self.notifier
    }

    /// Check forever, sleeping `interval` after every cycle. Cycle errors are
    /// logged and never end the loop.
    pub async fn run(&mut self) {
        info!("Starting price monitor for {}", self.collection);
        info!("Check interval: {} seconds", self.interval.as_secs());

        loop {
            match self.run_cycle().await {
                Ok(outcome) => debug!(?outcome, "Cycle complete"),
                Err(e) => error!("Error in monitoring loop: {}", e),
            }

            info!(
                "Waiting {} seconds until next check...",
                self.interval.as_secs()
            );
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One check: fetch, compare with the last-known snapshot, and on a
    /// change notify and then persist.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, MonitorError> {
        let current = match self.source.fetch(&self.collection).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to get current prices, will retry next interval");
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        if current == self.last_known {
            info!("No price changes detected");
            return Ok(CycleOutcome::Unchanged);
        }

        info!("Price change detected!");
        info!("Old prices: {}", self.last_known);
        info!("New prices: {}", current);

        let delivered = self
            .notifier
            .notify(&self.collection, &current, Some(&self.last_known))
            .await;
        if !delivered {
            error!("Failed to send notification");
            return Ok(CycleOutcome::NotifyFailed);
        }

        info!("Notification sent successfully");
        self.store.save(&current)?;
        self.last_known = current;
        Ok(CycleOutcome::Notified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::temp_path;
    use floorwatch_alerts::MockTransport;
    use floorwatch_feeds::{FeedError, MockRenderer, SourceConfig};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn monitor(renderer: MockRenderer, path: PathBuf) -> Monitor<MockRenderer, MockTransport> {
        let source = OpenSeaSource::new(
            renderer,
            SourceConfig {
                retry_delay: Duration::ZERO,
                ..Default::default()
            },
        );
        let notifier = Notifier::new(MockTransport::new(), "@floor");
        Monitor::new(
            "hypio",
            Duration::from_secs(300),
            source,
            notifier,
            StateStore::new(path),
        )
    }

    #[tokio::test]
    async fn test_first_run_notifies_against_default() {
        let path = temp_path("first-run");
        let renderer = MockRenderer::new().push_prices("0.44 ETH", "0.41 WETH");
        let mut monitor = monitor(renderer, path.clone());
        assert_eq!(monitor.last_known(), &PriceSnapshot::default());

        let outcome = monitor.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Notified);

        let expected = PriceSnapshot::new("0.44 ETH", "0.41 WETH");
        assert_eq!(monitor.last_known(), &expected);
        assert_eq!(StateStore::new(&path).load(), expected);

        let sent = monitor.notifier().transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].1,
            "<b>HYPIO</b> Update\n\nFloor Price: <b>0.44 ETH</b> +\nBest Offer: <b>0.41 WETH</b> +"
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_prices_do_nothing() {
        let path = temp_path("unchanged");
        let stored = PriceSnapshot::new("0.44 ETH", "0.41 WETH");
        StateStore::new(&path).save(&stored).unwrap();
        let modified_before = std::fs::metadata(&path).unwrap().modified().unwrap();

        let renderer = MockRenderer::new().push_prices("0.44 ETH", "0.41 WETH");
        let mut monitor = monitor(renderer, path.clone());

        let outcome = monitor.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Unchanged);
        assert!(monitor.notifier().transport().sent().is_empty());
        assert_eq!(
            std::fs::metadata(&path).unwrap().modified().unwrap(),
            modified_before
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_failed_notification_keeps_state() {
        let path = temp_path("notify-fail");
        let stored = PriceSnapshot::new("0.40 ETH", "0.41 WETH");
        StateStore::new(&path).save(&stored).unwrap();

        let renderer = MockRenderer::new()
            .push_prices("0.30 ETH", "0.41 WETH")
            .push_prices("0.30 ETH", "0.41 WETH");
        let mut monitor = monitor(renderer, path.clone());
        monitor.notifier().transport().set_fail(true);

        let outcome = monitor.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NotifyFailed);
        assert_eq!(monitor.last_known(), &stored);
        assert_eq!(StateStore::new(&path).load(), stored);

        // Next cycle retries the same comparison.
        monitor.notifier().transport().set_fail(false);
        let outcome = monitor.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Notified);
        let sent = monitor.notifier().transport().sent();
        assert_eq!(sent.len(), 1);
        // Amounts are re-rendered from the parsed value.
        assert!(sent[0].1.contains("Floor Price: <b>0.3 ETH</b> -"));
        assert!(sent[0].1.ends_with("Best Offer: <b>0.41 WETH</b>"));
        assert_eq!(
            StateStore::new(&path).load(),
            PriceSnapshot::new("0.3 ETH", "0.41 WETH")
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_cycle() {
        let path = temp_path("fetch-fail");
        let mut renderer = MockRenderer::new();
        for _ in 0..5 {
            renderer = renderer.push_error(FeedError::Timeout("waiting for floor_price element".into()));
        }
        let mut monitor = monitor(renderer, path.clone());

        let outcome = monitor.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::FetchFailed);
        assert_eq!(monitor.last_known(), &PriceSnapshot::default());
        assert!(monitor.notifier().transport().sent().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let path = temp_path("no-such-dir").join("memory.json");
        let renderer = MockRenderer::new().push_prices("0.44 ETH", "0.41 WETH");
        let mut monitor = monitor(renderer, path);

        let result = monitor.run_cycle().await;
        assert!(matches!(result, Err(MonitorError::Store(_))));
        assert_eq!(monitor.last_known(), &PriceSnapshot::default());
        assert_eq!(monitor.notifier().transport().sent().len(), 1);
    }

    #[tokio::test]
    async fn test_cycles_follow_price_moves() {
        let path = temp_path("moves");
        let renderer = MockRenderer::new()
            .push_prices("0.40 ETH", "0.38 WETH")
            .push_prices("0.44 ETH", "0.38 WETH")
            .push_prices("0.44 ETH", "0.38 WETH");
        let mut monitor = monitor(renderer, path.clone());

        let outcomes = [
            monitor.run_cycle().await.unwrap(),
            monitor.run_cycle().await.unwrap(),
            monitor.run_cycle().await.unwrap(),
        ];
        assert_eq!(
            outcomes,
            [
                CycleOutcome::Notified,
                CycleOutcome::Notified,
                CycleOutcome::Unchanged
            ]
        );
        let sent = monitor.notifier().transport().sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].1.contains("Floor Price: <b>0.44 ETH</b> +"));
        assert!(sent[1].1.ends_with("Best Offer: <b>0.38 WETH</b>"));
        assert_eq!(
            StateStore::new(&path).load(),
            PriceSnapshot::new("0.44 ETH", "0.38 WETH")
        );
        std::fs::remove_file(&path).unwrap();
    }
}
